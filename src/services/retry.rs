//! 重试包装器
//!
//! 所有错误都视为可重试，没有抖动也没有熔断。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::config::Config;

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// 固定间隔
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            backoff_multiplier: 1.0,
        }
    }

    /// 指数退避
    pub fn exponential(max_attempts: u32, base_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_multiplier,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::exponential(
            config.retry_max_attempts,
            Duration::from_millis(config.retry_base_delay_ms),
            config.retry_backoff,
        )
    }

    /// 第 `attempt` 次失败后的等待时间（attempt 从 1 开始）
    ///
    /// 负数或 NaN 的结果按 0 处理，溢出时取 `Duration::MAX`。
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_secs(1), 2.0)
    }
}

/// 带重试地执行异步操作
///
/// 失败后等待 `base_delay * backoff_multiplier^(attempt-1)` 再重试，
/// 连续失败 `max_attempts` 次后返回最后一次的错误。
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    with_retry_sleeping(policy, label, operation, tokio::time::sleep).await
}

/// 同 `with_retry`，等待函数由调用方提供
pub async fn with_retry_sleeping<T, E, F, Fut, S, SFut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
    mut sleep: S,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    S: FnMut(Duration) -> SFut,
    SFut: Future<Output = ()>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => {
                error!("❌ {} 已达到最大重试次数 {}: {}", label, max_attempts, e);
                return Err(e);
            }
            Err(e) => {
                let wait = policy.delay_after(attempt);
                warn!(
                    "⚠️ {} 第 {}/{} 次失败，{:.2} 秒后重试: {}",
                    label,
                    attempt,
                    max_attempts,
                    wait.as_secs_f64(),
                    e
                );
                sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<Duration>>>, impl FnMut(Duration) -> std::future::Ready<()>) {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let sink = delays.clone();
        (delays, move |d| {
            sink.lock().unwrap().push(d);
            std::future::ready(())
        })
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(100), 2.0);
        let calls = Arc::new(Mutex::new(0u32));
        let (delays, sleep) = recorder();

        let counter = calls.clone();
        let result: Result<&str, String> = with_retry_sleeping(
            &policy,
            "flaky",
            move || {
                let counter = counter.clone();
                async move {
                    let mut n = counter.lock().unwrap();
                    *n += 1;
                    if *n < 3 {
                        Err(format!("attempt {} failed", *n))
                    } else {
                        Ok("done")
                    }
                }
            },
            sleep,
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(*calls.lock().unwrap(), 3);
        assert_eq!(delays.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts_with_backoff_delays() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(100), 3.0);
        let calls = Arc::new(Mutex::new(0u32));
        let (delays, sleep) = recorder();

        let counter = calls.clone();
        let result: Result<(), String> = with_retry_sleeping(
            &policy,
            "always failing",
            move || {
                let counter = counter.clone();
                async move {
                    *counter.lock().unwrap() += 1;
                    Err("boom".to_string())
                }
            },
            sleep,
        )
        .await;

        assert_eq!(result, Err("boom".to_string()));
        assert_eq!(*calls.lock().unwrap(), 3);
        assert_eq!(
            *delays.lock().unwrap(),
            vec![Duration::from_millis(100), Duration::from_millis(300)]
        );
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::fixed(0, Duration::from_millis(10));
        let (delays, sleep) = recorder();

        let result: Result<u8, String> =
            with_retry_sleeping(&policy, "once", || async { Err("no".to_string()) }, sleep).await;

        assert!(result.is_err());
        assert!(delays.lock().unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range_backoff_saturates() {
        let base = Duration::from_millis(1);
        assert_eq!(RetryPolicy::exponential(3, base, -1.0).delay_after(2), Duration::ZERO);
        assert_eq!(RetryPolicy::exponential(3, base, f64::NAN).delay_after(2), Duration::ZERO);
        assert_eq!(RetryPolicy::exponential(3, base, 1e300).delay_after(3), Duration::MAX);
    }

    #[tokio::test]
    async fn test_negative_backoff_retries_without_waiting() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(1), -1.0);
        let mut calls = 0;

        let result: Result<(), String> = with_retry(&policy, "always fails", || {
            calls += 1;
            async { Err("boom".to_string()) }
        })
        .await;

        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_fixed_policy_keeps_delay_constant() {
        let policy = RetryPolicy::fixed(5, Duration::from_millis(250));
        assert_eq!(policy.delay_after(1), Duration::from_millis(250));
        assert_eq!(policy.delay_after(4), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_with_retry_uses_real_sleep() {
        let policy = RetryPolicy::fixed(2, Duration::from_millis(1));
        let calls = Arc::new(Mutex::new(0u32));
        let counter = calls.clone();
        let result: Result<u32, String> = with_retry(&policy, "real", move || {
            let counter = counter.clone();
            async move {
                let mut n = counter.lock().unwrap();
                *n += 1;
                if *n == 1 {
                    Err("first".to_string())
                } else {
                    Ok(*n)
                }
            }
        })
        .await;
        tokio_test::assert_ok!(&result);
        assert_eq!(result, Ok(2));
    }
}
