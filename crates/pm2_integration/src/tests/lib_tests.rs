use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct CountingSupervisor {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    refuse_connect: bool,
    fail_with: Option<SupervisorError>,
    applied: tokio::sync::Mutex<Vec<(LifecycleAction, String)>>,
}

impl CountingSupervisor {
    fn result(&self) -> Result<(), SupervisorError> {
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn record(&self, action: LifecycleAction, id: &ProcessId) -> Result<(), SupervisorError> {
        self.applied
            .lock()
            .await
            .push((action, id.as_str().to_string()));
        self.result()
    }
}

#[async_trait]
impl ProcessSupervisor for CountingSupervisor {
    async fn connect(&self) -> Result<(), SupervisorError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse_connect {
            return Err(SupervisorError::Unavailable("daemon down".into()));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ProcessRecord>, SupervisorError> {
        self.result()?;
        Ok(vec![ProcessRecord {
            id: ProcessId::from(0),
            name: "api".into(),
            status: shared::domain::ProcessStatus::Online,
        }])
    }

    async fn start(&self, id: &ProcessId) -> Result<(), SupervisorError> {
        self.record(LifecycleAction::Start, id).await
    }

    async fn stop(&self, id: &ProcessId) -> Result<(), SupervisorError> {
        self.record(LifecycleAction::Stop, id).await
    }

    async fn restart(&self, id: &ProcessId) -> Result<(), SupervisorError> {
        self.record(LifecycleAction::Restart, id).await
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn snapshot_releases_session_after_success() {
    let fake = Arc::new(CountingSupervisor::default());
    let supervisor: Arc<dyn ProcessSupervisor> = fake.clone();

    let records = snapshot(&supervisor).await.expect("snapshot");
    assert_eq!(records.len(), 1);
    assert_eq!(fake.connects.load(Ordering::SeqCst), 1);
    assert_eq!(fake.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn session_is_released_when_the_operation_fails() {
    let fake = Arc::new(CountingSupervisor {
        fail_with: Some(SupervisorError::CommandFailed {
            command: "stop 7".into(),
            detail: "process not found".into(),
        }),
        ..CountingSupervisor::default()
    });
    let supervisor: Arc<dyn ProcessSupervisor> = fake.clone();

    let err = run_action(&supervisor, LifecycleAction::Stop, &ProcessId::from(7))
        .await
        .expect_err("should fail");
    assert_eq!(err.detail(), "process not found");
    assert_eq!(fake.disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(
        fake.applied.lock().await.as_slice(),
        &[(LifecycleAction::Stop, "7".to_string())]
    );
}

#[tokio::test]
async fn session_is_released_when_connect_fails() {
    let fake = Arc::new(CountingSupervisor {
        refuse_connect: true,
        ..CountingSupervisor::default()
    });
    let supervisor: Arc<dyn ProcessSupervisor> = fake.clone();

    let err = snapshot(&supervisor).await.expect_err("should fail");
    assert!(matches!(err, SupervisorError::Unavailable(_)));
    assert_eq!(fake.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn apply_dispatches_each_lifecycle_action() {
    let fake = Arc::new(CountingSupervisor::default());
    let supervisor: Arc<dyn ProcessSupervisor> = fake.clone();

    for action in LifecycleAction::ALL {
        run_action(&supervisor, action, &ProcessId::from(2))
            .await
            .expect("action");
    }
    let applied: Vec<LifecycleAction> = fake
        .applied
        .lock()
        .await
        .iter()
        .map(|(action, _)| *action)
        .collect();
    assert_eq!(applied, LifecycleAction::ALL.to_vec());
}
