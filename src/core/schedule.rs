use crate::utils::error::{EtlError, Result};
use chrono::{Duration as ChronoDuration, NaiveDateTime, NaiveTime};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// 每天固定時間觸發一次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// 接受 `HH:MM` 或 `HH:MM:SS`
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
            .map(Self::new)
            .map_err(|e| EtlError::InvalidConfigValueError {
                field: "schedule.daily_at".to_string(),
                value: value.to_string(),
                reason: format!("expected HH:MM or HH:MM:SS ({})", e),
            })
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// 下一次觸發時間，剛好等於觸發時間時算作已經過去
    pub fn next_run_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today_run = now.date().and_time(self.at);
        if today_run > now {
            today_run
        } else {
            today_run + ChronoDuration::days(1)
        }
    }

    pub fn until_next_run(&self, now: NaiveDateTime) -> Duration {
        (self.next_run_after(now) - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.at)
    }
}

/// 常駐迴圈：睡到下一次觸發時間就執行 `job`，直到收到 Ctrl-C。
/// 單次執行失敗只記錄，不會結束排程。
pub async fn serve<F, Fut, T>(schedule: DailySchedule, job: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    serve_until(
        schedule,
        || chrono::Local::now().naive_local(),
        tokio::signal::ctrl_c(),
        job,
    )
    .await
}

/// 同 [`serve`]，但時鐘與停止訊號由呼叫端提供
pub async fn serve_until<C, S, F, Fut, T>(
    schedule: DailySchedule,
    clock: C,
    shutdown: S,
    mut job: F,
) -> Result<()>
where
    C: Fn() -> NaiveDateTime,
    S: Future<Output = std::io::Result<()>>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    tokio::pin!(shutdown);

    loop {
        let now = clock();
        let next = schedule.next_run_after(now);
        let wait = schedule.until_next_run(now);
        tracing::info!("⏰ Next run scheduled at {} (in {:?})", next, wait);

        tokio::select! {
            biased;
            signal = &mut shutdown => {
                signal?;
                tracing::info!("🛑 Shutdown requested, stopping scheduler");
                return Ok(());
            }
            _ = tokio::time::sleep(wait) => {}
        }

        tracing::info!("🚀 Scheduled run starting");
        match job().await {
            Ok(_) => tracing::info!("✅ Scheduled run finished"),
            Err(e) => {
                tracing::error!(
                    "❌ Scheduled run failed: {} (Category: {:?}, Severity: {:?})",
                    e,
                    e.category(),
                    e.severity()
                );
                tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(DailySchedule::parse("06:00").unwrap().to_string(), "06:00:00");
        assert_eq!(
            DailySchedule::parse(" 18:45:30 ").unwrap().to_string(),
            "18:45:30"
        );
        assert!(DailySchedule::parse("6am").is_err());
        assert!(DailySchedule::parse("24:00").is_err());
    }

    #[test]
    fn test_next_run_later_today() {
        let schedule = DailySchedule::parse("06:00").unwrap();
        assert_eq!(
            schedule.next_run_after(at(2025, 3, 10, 5, 59)),
            at(2025, 3, 10, 6, 0)
        );
    }

    #[test]
    fn test_next_run_tomorrow_when_passed() {
        let schedule = DailySchedule::parse("06:00").unwrap();
        assert_eq!(
            schedule.next_run_after(at(2025, 3, 10, 6, 0)),
            at(2025, 3, 11, 6, 0)
        );
        assert_eq!(
            schedule.next_run_after(at(2025, 12, 31, 23, 0)),
            at(2026, 1, 1, 6, 0)
        );
    }

    #[test]
    fn test_until_next_run() {
        let schedule = DailySchedule::parse("06:00").unwrap();
        assert_eq!(
            schedule.until_next_run(at(2025, 3, 10, 5, 30)),
            Duration::from_secs(30 * 60)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_does_not_stop_the_loop() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::{Arc, Mutex};

        let schedule = DailySchedule::parse("06:00").unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let stop_tx = Mutex::new(Some(stop_tx));
        let shutdown = async move {
            let _ = stop_rx.await;
            Ok::<(), std::io::Error>(())
        };

        let job_calls = calls.clone();
        serve_until(schedule, || at(2025, 3, 10, 5, 0), shutdown, move || {
            let call = job_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == 2 {
                if let Some(tx) = stop_tx.lock().unwrap().take() {
                    let _ = tx.send(());
                }
            }
            async move {
                if call == 1 {
                    Err(EtlError::RemoteFileNotFound {
                        path: "/home/viljoenbev/Vilbev-20250310.zip".to_string(),
                    })
                } else {
                    Ok(call)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_run() {
        let schedule = DailySchedule::parse("06:00").unwrap();
        let mut ran = false;

        serve_until(
            schedule,
            || at(2025, 3, 10, 5, 0),
            async { Ok::<(), std::io::Error>(()) },
            || {
                ran = true;
                async { Ok::<(), EtlError>(()) }
            },
        )
        .await
        .unwrap();

        assert!(!ran);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_signal_error_is_returned() {
        let schedule = DailySchedule::parse("06:00").unwrap();
        let result = serve_until(
            schedule,
            || at(2025, 3, 10, 5, 0),
            async { Err::<(), _>(std::io::Error::other("no signal handler")) },
            || async { Ok::<(), EtlError>(()) },
        )
        .await;

        assert!(matches!(result, Err(EtlError::IoError(_))));
    }
}
