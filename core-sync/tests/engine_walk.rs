//! Integration tests for the sync walk over a layer hierarchy

use async_trait::async_trait;
use bridge_traits::time::Clock;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use core_catalog::ServerVersion;
use core_sync::{
    CancellationToken, LayerRole, SyncConfig, SyncEngine, SyncLayer, SyncOutcome, SyncStatus,
    VersionLookup,
};
use mockall::mock;
use mockall::predicate::eq;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mock! {
    Versions {}

    #[async_trait]
    impl VersionLookup for Versions {
        async fn server_version(&self, account: &str) -> Option<ServerVersion>;
    }
}

type Journal = Arc<Mutex<Vec<String>>>;

/// What a recording layer does when synced
#[derive(Clone, Copy)]
enum Effect {
    Nothing,
    IoError,
    Insert(u64),
    Cancel,
}

struct RecordingLayer {
    name: String,
    role: LayerRole,
    children: Vec<Arc<dyn SyncLayer>>,
    journal: Journal,
    effect: Effect,
    token: Option<CancellationToken>,
}

#[async_trait]
impl SyncLayer for RecordingLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> LayerRole {
        self.role.clone()
    }

    fn children(&self) -> &[Arc<dyn SyncLayer>] {
        &self.children
    }

    async fn sync(&self, authority: &str, version: Option<ServerVersion>, outcome: &mut SyncOutcome) {
        self.journal.lock().unwrap().push(format!(
            "{} via {} at {}",
            self.name,
            authority,
            version.map(|v| v.to_string()).unwrap_or_default()
        ));
        match self.effect {
            Effect::Nothing => {}
            Effect::IoError => outcome.io_errors += 1,
            Effect::Insert(n) => outcome.inserted_count += n,
            Effect::Cancel => {
                if let Some(token) = &self.token {
                    token.cancel();
                }
            }
        }
    }

    async fn sync_local(&self) {
        self.journal.lock().unwrap().push(format!("{} locally", self.name));
    }
}

struct Builder {
    journal: Journal,
    token: CancellationToken,
}

impl Builder {
    fn new() -> Self {
        Self {
            journal: Arc::new(Mutex::new(Vec::new())),
            token: CancellationToken::new(),
        }
    }

    fn layer(&self, name: &str, role: LayerRole, effect: Effect) -> Arc<dyn SyncLayer> {
        Arc::new(RecordingLayer {
            name: name.to_string(),
            role,
            children: Vec::new(),
            journal: Arc::clone(&self.journal),
            effect,
            token: Some(self.token.clone()),
        })
    }

    fn remote(&self, name: &str, account: &str, effect: Effect) -> Arc<dyn SyncLayer> {
        self.layer(
            name,
            LayerRole::Remote {
                account: account.to_string(),
            },
            effect,
        )
    }

    fn group(&self, name: &str, children: Vec<Arc<dyn SyncLayer>>) -> Arc<dyn SyncLayer> {
        Arc::new(RecordingLayer {
            name: name.to_string(),
            role: LayerRole::Group,
            children,
            journal: Arc::clone(&self.journal),
            effect: Effect::Nothing,
            token: None,
        })
    }

    fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }
}

/// Clock that advances one second per reading
struct SteppingClock {
    base: DateTime<Utc>,
    ticks: Mutex<i64>,
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut ticks = self.ticks.lock().unwrap();
        *ticks += 1;
        self.base + ChronoDuration::seconds(*ticks)
    }
}

fn engine(versions: MockVersions) -> SyncEngine {
    SyncEngine::new(
        SyncConfig::new("com.example.layers").unwrap(),
        Arc::new(versions),
    )
}

#[tokio::test]
async fn test_walk_order_and_single_version_lookup() {
    let mut versions = MockVersions::new();
    versions
        .expect_server_version()
        .with(eq("x"))
        .times(1)
        .returning(|_| Some(ServerVersion::new(4, 5)));

    let b = Builder::new();
    let layers = vec![
        b.remote("A", "x", Effect::Insert(2)),
        b.group("GroupB", vec![b.remote("C", "x", Effect::IoError)]),
        b.layer("D", LayerRole::Local, Effect::Nothing),
    ];

    let report = engine(versions)
        .run(&layers, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        b.journal(),
        vec![
            "A via com.example.layers at 4.5",
            "C via com.example.layers at 4.5",
            "D locally"
        ]
    );
    assert_eq!(report.status, SyncStatus::Completed);
    assert_eq!(report.layers_visited, 4);
    assert_eq!(report.summary, "I/O errors: 1\nInserted: 2");
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_unknown_version_is_passed_as_none() {
    let mut versions = MockVersions::new();
    versions
        .expect_server_version()
        .times(2)
        .returning(|_| None);

    let b = Builder::new();
    let layers = vec![
        b.remote("A", "x", Effect::Nothing),
        b.remote("B", "y", Effect::Nothing),
        b.remote("C", "x", Effect::Nothing),
    ];

    let report = engine(versions)
        .run(&layers, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        b.journal(),
        vec![
            "A via com.example.layers at ",
            "B via com.example.layers at ",
            "C via com.example.layers at "
        ]
    );
    assert!(report.is_success());
    assert!(report.summary.is_empty());
}

#[tokio::test]
async fn test_cancel_during_first_layer_stops_walk() {
    let mut versions = MockVersions::new();
    // Resolved for A only; C under GroupB is never reached
    versions
        .expect_server_version()
        .with(eq("x"))
        .times(1)
        .returning(|_| Some(ServerVersion::new(4, 5)));

    let b = Builder::new();
    let layers = vec![
        b.remote("A", "x", Effect::Cancel),
        b.group("GroupB", vec![b.remote("C", "x", Effect::Insert(1))]),
        b.layer("D", LayerRole::Local, Effect::Nothing),
    ];

    let report = engine(versions).run(&layers, &b.token).await.unwrap();

    assert_eq!(b.journal(), vec!["A via com.example.layers at 4.5"]);
    assert_eq!(report.status, SyncStatus::Cancelled);
    assert!(report.was_cancelled());
    assert_eq!(report.layers_visited, 1);
    assert_eq!(report.outcome.inserted_count, 0);
    assert_eq!(report.outcome, SyncOutcome::default());
    assert!(report.summary.is_empty());
}

#[tokio::test]
async fn test_report_duration_uses_injected_clock() {
    let clock = Arc::new(SteppingClock {
        base: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        ticks: Mutex::new(0),
    });

    let b = Builder::new();
    let layers = vec![b.layer("D", LayerRole::Local, Effect::Nothing)];

    let report = engine(MockVersions::new())
        .with_clock(clock)
        .run(&layers, &CancellationToken::new())
        .await
        .unwrap();

    // created, started, finished: three readings one second apart
    assert_eq!(report.duration, Duration::from_secs(1));
}
