//! Scripted search sessions for pipeline tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta};
use magpie_client::{
    Identity, PageCursor, SearchPage, SearchQuery, SearchSession, SessionData, SessionFactory,
};
use magpie_types::{Credentials, HarvestError, Post, PostedAt, Result};

/// Day index of a window relative to the scripted base date (2018-01-01).
fn day_index(date: NaiveDate) -> i64 {
    let base = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
    (date - base).num_days()
}

/// Shared script controlling every [`ScriptedSession`] in a test.
#[derive(Debug, Default)]
pub(crate) struct ScriptedBehavior {
    state: Mutex<BehaviorState>,
}

#[derive(Debug, Default)]
struct BehaviorState {
    posts_per_day: usize,
    stray_posts: bool,
    fail_once: HashSet<(usize, i64)>,
    always_transient: HashSet<(usize, i64)>,
    logins: HashMap<usize, u32>,
    restores: HashMap<usize, u32>,
}

impl ScriptedBehavior {
    pub(crate) fn set_posts_per_day(&self, count: usize) {
        self.state.lock().unwrap().posts_per_day = count;
    }

    /// Adds one out-of-window post to every day's first page.
    pub(crate) fn set_stray_posts(&self, stray: bool) {
        self.state.lock().unwrap().stray_posts = stray;
    }

    /// The first search for (worker, day) fails with `ResourceGone`.
    pub(crate) fn fail_once_on(&self, worker: usize, day: i64) {
        self.state.lock().unwrap().fail_once.insert((worker, day));
    }

    /// Every search for (worker, day) fails with `Transient`.
    pub(crate) fn always_fail_transient_on(&self, worker: usize, day: i64) {
        self.state
            .lock()
            .unwrap()
            .always_transient
            .insert((worker, day));
    }

    pub(crate) fn login_count(&self, worker: usize) -> u32 {
        *self.state.lock().unwrap().logins.get(&worker).unwrap_or(&0)
    }

    pub(crate) fn restore_count(&self, worker: usize) -> u32 {
        *self
            .state
            .lock()
            .unwrap()
            .restores
            .get(&worker)
            .unwrap_or(&0)
    }
}

/// A deterministic in-memory search session.
///
/// Every day has `posts_per_day` posts with unique links, paginated at the
/// query's page size; failures are injected through [`ScriptedBehavior`].
#[derive(Debug)]
pub(crate) struct ScriptedSession {
    worker: usize,
    behavior: Arc<ScriptedBehavior>,
}

impl ScriptedSession {
    pub(crate) const fn new(worker: usize, behavior: Arc<ScriptedBehavior>) -> Self {
        Self { worker, behavior }
    }

    fn day_posts(&self, query: &SearchQuery) -> Vec<Post> {
        let state = self.behavior.state.lock().unwrap();
        let date = query.window.date();

        let mut posts: Vec<Post> = (0..state.posts_per_day)
            .map(|i| Post {
                author: format!("user{}", self.worker),
                text: format!("{} on {date} #{i}", query.text),
                reposts: i as u64,
                likes: (i * 2) as u64,
                replies: 0,
                posted_at: PostedAt::from_datetime(
                    query.window.start() + TimeDelta::minutes(i as i64),
                ),
                link: format!("https://posts.example/{date}/{i}"),
            })
            .collect();

        if state.stray_posts {
            // Upstream over-inclusion: one post just before the window.
            posts.insert(
                0,
                Post {
                    author: "stray".to_string(),
                    text: "out of window".to_string(),
                    reposts: 0,
                    likes: 0,
                    replies: 0,
                    posted_at: PostedAt::from_datetime(
                        query.window.start() - TimeDelta::seconds(1),
                    ),
                    link: format!("https://posts.example/{date}/stray"),
                },
            );
        }

        posts
    }
}

#[async_trait]
impl SearchSession for ScriptedSession {
    async fn restore(&self, _session: &SessionData) -> Result<Identity> {
        let mut state = self.behavior.state.lock().unwrap();
        *state.restores.entry(self.worker).or_insert(0) += 1;
        Ok(Identity::new(format!("user{}", self.worker)))
    }

    async fn login(&self, credentials: &Credentials) -> Result<SessionData> {
        let mut state = self.behavior.state.lock().unwrap();
        *state.logins.entry(self.worker).or_insert(0) += 1;
        let mut cookies = BTreeMap::new();
        cookies.insert("auth_token".to_string(), credentials.username.clone());
        Ok(SessionData::new(cookies))
    }

    async fn identity(&self) -> Result<Identity> {
        Ok(Identity::new(format!("user{}", self.worker)))
    }

    async fn search(&self, query: &SearchQuery, cursor: Option<&PageCursor>) -> Result<SearchPage> {
        let day = day_index(query.window.date());
        {
            let mut state = self.behavior.state.lock().unwrap();
            if state.fail_once.remove(&(self.worker, day)) {
                return Err(HarvestError::ResourceGone(format!(
                    "target vanished on day {day}"
                )));
            }
            if state.always_transient.contains(&(self.worker, day)) {
                return Err(HarvestError::Transient(format!(
                    "connection reset on day {day}"
                )));
            }
        }

        let posts = self.day_posts(query);
        let offset: usize = cursor.map_or(0, |c| c.as_str().parse().unwrap_or(0));
        let end = (offset + query.page_size).min(posts.len());
        let next = (end < posts.len()).then(|| PageCursor::new(end.to_string()));

        Ok(SearchPage {
            posts: posts[offset..end].to_vec(),
            next,
        })
    }
}

/// Factory handing every worker a [`ScriptedSession`] sharing one script.
#[derive(Debug, Default)]
pub(crate) struct ScriptedFactory {
    behavior: Arc<ScriptedBehavior>,
}

impl ScriptedFactory {
    pub(crate) fn behavior(&self) -> Arc<ScriptedBehavior> {
        Arc::clone(&self.behavior)
    }
}

impl SessionFactory for ScriptedFactory {
    fn create(&self, worker: usize, _credentials: &Credentials) -> Box<dyn SearchSession> {
        Box::new(ScriptedSession::new(worker, Arc::clone(&self.behavior)))
    }
}
