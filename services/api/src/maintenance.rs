//! Periodic session housekeeping
//!
//! Runs on its own schedule, apart from request handling. Every step is a
//! row-level update guarded by the row's state, so it can interleave freely
//! with logins and logouts.

use anyhow::Result;
use auth::rate_limiter::RateLimiter;
use chrono::{DateTime, Duration, Utc};
use common::{DatabaseResult, DynStore};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Counts from one maintenance pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub expired: u64,
    pub purged: u64,
    pub unlocked: u64,
    pub limiter_entries: usize,
}

#[derive(Clone)]
pub struct SessionMaintenance {
    store: DynStore,
    retention: Duration,
    limiter: RateLimiter,
}

impl SessionMaintenance {
    pub fn new(store: DynStore, retention_days: i64, limiter: RateLimiter) -> Self {
        Self {
            store,
            retention: Duration::days(retention_days),
            limiter,
        }
    }

    /// One pass: expire, purge, unlock, forget idle limiter keys
    pub async fn run_once(&self, now: DateTime<Utc>) -> DatabaseResult<MaintenanceReport> {
        let expired = self.store.expire_sessions(now).await?;
        let purged = self.store.purge_sessions(now - self.retention).await?;
        let unlocked = self.store.release_expired_locks(now).await?;
        let limiter_entries = self.limiter.purge_idle().await;

        Ok(MaintenanceReport {
            expired,
            purged,
            unlocked,
            limiter_entries,
        })
    }

    /// Register the job and start the scheduler
    ///
    /// The returned scheduler must be kept alive for the job to keep firing.
    pub async fn start(&self, schedule: &str) -> Result<JobScheduler> {
        let maintenance = self.clone();
        let scheduler = JobScheduler::new().await?;

        let job = Job::new_async(schedule, move |_, _| {
            let maintenance = maintenance.clone();
            Box::pin(async move {
                match maintenance.run_once(Utc::now()).await {
                    Ok(report) => info!(
                        "Session maintenance: {} expired, {} purged, {} unlocked, {} limiter entries dropped",
                        report.expired, report.purged, report.unlocked, report.limiter_entries
                    ),
                    Err(e) => error!("Session maintenance failed: {}", e),
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Started session maintenance with schedule: {}", schedule);
        Ok(scheduler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::rate_limiter::RateLimiterConfig;
    use common::models::{Account, Employee, EmployeeId, EmployeeStatus, NewSession, Role};
    use common::{MemoryStore, Store};
    use std::sync::Arc;
    use uuid::Uuid;

    fn employee(now: DateTime<Utc>) -> Employee {
        Employee {
            employee_id: EmployeeId::from_number(1),
            first_name: "Juan".into(),
            middle_name: None,
            last_name: "Dela Cruz".into(),
            email: "juan@example.com".into(),
            phone: None,
            address: None,
            department: None,
            position: None,
            hire_date: now.date_naive(),
            hourly_rate: 20.0,
            status: EmployeeStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn session(account_id: Uuid, hash: &str, created_at: DateTime<Utc>, ttl: Duration) -> NewSession {
        NewSession {
            id: Uuid::new_v4(),
            account_id,
            token_hash: hash.to_string(),
            remember_me: false,
            ip_address: None,
            user_agent: None,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    #[tokio::test]
    async fn test_run_once_expires_purges_and_unlocks() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        let account = Account::new(
            EmployeeId::from_number(1),
            "juandelacruz".into(),
            "hash".into(),
            Role::Employee,
            now,
        );
        store
            .create_employee_with_account(&employee(now), &account)
            .await
            .unwrap();

        let live = store
            .insert_session(&session(account.id, "live", now, Duration::hours(1)))
            .await
            .unwrap();
        let stale = store
            .insert_session(&session(account.id, "stale", now - Duration::hours(2), Duration::hours(1)))
            .await
            .unwrap();
        let ancient = store
            .insert_session(&session(account.id, "ancient", now - Duration::days(40), Duration::hours(1)))
            .await
            .unwrap();
        store
            .lock_account(account.id, now - Duration::minutes(1), now - Duration::minutes(16))
            .await
            .unwrap();

        let maintenance = SessionMaintenance::new(
            store.clone(),
            30,
            RateLimiter::new(RateLimiterConfig::default()),
        );
        let report = maintenance.run_once(now).await.unwrap();

        assert_eq!(report.expired, 2);
        assert_eq!(report.purged, 1);
        assert_eq!(report.unlocked, 1);

        assert!(store.find_session(live.id).await.unwrap().unwrap().is_active);
        assert!(!store.find_session(stale.id).await.unwrap().unwrap().is_active);
        assert!(store.find_session(ancient.id).await.unwrap().is_none());
        let account = store.find_account(account.id).await.unwrap().unwrap();
        assert!(account.locked_until.is_none());
    }
}
