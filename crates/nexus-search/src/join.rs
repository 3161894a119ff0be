//! Join that keeps every branch's outcome.
//!
//! Unlike `try_join`, a failing branch does not cancel or hide the others.

use crate::error::Result;
use futures::future::{join, join3};
use std::future::Future;

/// Run both fetches concurrently and return both outcomes.
pub async fn join_settled<A, B, FA, FB>(a: FA, b: FB) -> (Result<A>, Result<B>)
where
    FA: Future<Output = Result<A>>,
    FB: Future<Output = Result<B>>,
{
    join(a, b).await
}

/// Three-way [`join_settled`].
pub async fn join_settled3<A, B, C, FA, FB, FC>(
    a: FA,
    b: FB,
    c: FC,
) -> (Result<A>, Result<B>, Result<C>)
where
    FA: Future<Output = Result<A>>,
    FB: Future<Output = Result<B>>,
    FC: Future<Output = Result<C>>,
{
    join3(a, b, c).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    #[tokio::test]
    async fn test_failure_does_not_hide_sibling() {
        let (a, b) = join_settled(
            async { Err::<u32, _>(FetchError::Server { status: 500 }) },
            async { Ok::<_, FetchError>("anime") },
        )
        .await;

        assert_eq!(a, Err(FetchError::Server { status: 500 }));
        assert_eq!(b, Ok("anime"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_branches_run_concurrently() {
        let start = Instant::now();
        let branch = |ms| async move {
            sleep(Duration::from_millis(ms)).await;
            Ok::<_, FetchError>(ms)
        };

        let (a, b, c) = join_settled3(branch(100), branch(200), branch(300)).await;

        assert_eq!((a, b, c), (Ok(100), Ok(200), Ok(300)));
        assert!(start.elapsed() < Duration::from_millis(600));
    }
}
