use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;

/// 判断错误是否值得重试（超时、5xx、连接错误），4xx 等客户端错误不重试
pub fn is_retryable(err: &anyhow::Error) -> bool {
    let err_msg = err.to_string().to_lowercase();
    err_msg.contains("timeout")
        || err_msg.contains("timed out")
        || err_msg.contains("connection")
        || err_msg.contains("500")
        || err_msg.contains("502")
        || err_msg.contains("503")
        || err_msg.contains("504")
        || err_msg.contains("server error")
        || err_msg.contains("broken pipe")
        || err_msg.contains("reset by peer")
}

/// 指数退避重试。
///
/// # Arguments
/// * `max_retries` - 最大重试次数（不含首次请求，总共最多执行 max_retries + 1 次）
/// * `operation` - 异步操作闭包
pub async fn retry_with_backoff<F, Fut, T>(
    max_retries: u32,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !is_retryable(&e) || attempt >= max_retries {
                    return Err(e);
                }
                // 1s, 2s, 4s ...
                let delay = Duration::from_secs(1 << attempt.min(6));
                log::warn!(
                    "请求失败（第 {} 次），{}s 后重试: {}",
                    attempt + 1,
                    delay.as_secs(),
                    e
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();
        let result = retry_with_backoff(3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(anyhow!("AI API error (503 Service Unavailable)"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s + 2s
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow!("AI API error (401 Unauthorized)")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow!("operation timed out")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
