//! Sequencing: pipelines, `run_serial` and `wait`

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::step::Step;
use super::{Action, ActionContext};
use crate::common::Result;

/// Run `tasks` in order, each on the previous one's output
///
/// Stops at the first error; later tasks never start.
pub async fn run_serial<T, I, F, Fut>(seed: T, tasks: I) -> Result<T>
where
    I: IntoIterator<Item = F>,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut acc = seed;
    for task in tasks {
        acc = task(acc).await?;
    }
    Ok(acc)
}

/// An ordered list of actions, itself an action
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn Action>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action
    pub fn then<A: Action + 'static>(mut self, action: A) -> Self {
        self.steps.push(Arc::new(action));
        self
    }

    /// Build every step, failing on the first invalid one
    pub fn from_steps(steps: Vec<Step>) -> Result<Self> {
        let steps = steps
            .into_iter()
            .map(Step::build)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[async_trait]
impl Action for Pipeline {
    async fn apply(&self, ctx: ActionContext) -> Result<ActionContext> {
        let tasks: Vec<_> = self
            .steps
            .iter()
            .map(|step| move |ctx: ActionContext| step.apply(ctx))
            .collect();
        run_serial(ctx, tasks).await
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerialOptions {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaitOptions {
    pub ms: u64,
}

/// Suspend the pipeline for a while
#[derive(Debug, Clone)]
pub struct Wait {
    duration: Duration,
}

impl Wait {
    pub fn new(options: WaitOptions) -> Self {
        Self {
            duration: Duration::from_millis(options.ms),
        }
    }
}

#[async_trait]
impl Action for Wait {
    async fn apply(&self, mut ctx: ActionContext) -> Result<ActionContext> {
        ctx.push(format!("wait {} ms", self.duration.as_millis()));
        debug!(ms = self.duration.as_millis() as u64, "Waiting");
        tokio::time::sleep(self.duration).await;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Push(&'static str);

    #[async_trait]
    impl Action for Push {
        async fn apply(&self, mut ctx: ActionContext) -> Result<ActionContext> {
            ctx.push(self.0);
            Ok(ctx)
        }
    }

    #[derive(Debug)]
    struct Fail;

    #[async_trait]
    impl Action for Fail {
        async fn apply(&self, ctx: ActionContext) -> Result<ActionContext> {
            Err(Error::Assertion(ctx.trail("failed")))
        }
    }

    #[tokio::test]
    async fn test_run_serial_threads_values() {
        let tasks: Vec<Box<dyn FnOnce(u32) -> std::future::Ready<Result<u32>>>> = vec![
            Box::new(|n| std::future::ready(Ok(n + 1))),
            Box::new(|n| std::future::ready(Ok(n * 10))),
        ];
        assert_eq!(run_serial(1, tasks).await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_run_serial_stops_at_first_error() {
        let calls = AtomicUsize::new(0);
        let tasks = (0..3).map(|i| {
            let calls = &calls;
            move |n: u32| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if i == 1 {
                    Err(Error::Thrown("stop".into()))
                } else {
                    Ok(n)
                }
            }
        });
        assert!(run_serial(0, tasks).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pipeline_order_and_trail() {
        let pipeline = Pipeline::new().then(Push("a")).then(Push("b")).then(Fail).then(Push("c"));
        let err = pipeline.apply(ActionContext::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "when a then b: failed");

        let ok = Pipeline::new().then(Push("a")).then(Push("b"));
        let ctx = ok.apply(ActionContext::new()).await.unwrap();
        assert_eq!(ctx.stack(), ["a", "b"]);
    }

    #[tokio::test]
    async fn test_wait() {
        let start = std::time::Instant::now();
        let ctx = Wait::new(WaitOptions { ms: 20 })
            .apply(ActionContext::new())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(ctx.stack(), ["wait 20 ms"]);
    }
}
