//! Retry loop for unary calls.

use std::sync::Arc;

use super::{Attempts, attempt_headers};
use crate::Status;
use crate::config::CallOptions;
use crate::interceptor::{BoxFuture, UnaryFunc, UnaryRequest, UnaryResponse};
use crate::trace::RetryTrace;

pub(super) fn wrap(defaults: CallOptions, trace: Arc<dyn RetryTrace>, next: UnaryFunc) -> UnaryFunc {
    Arc::new(
        move |request: UnaryRequest| -> BoxFuture<'static, Result<UnaryResponse, Status>> {
            let settings = defaults.merge(&request.options).resolve();
            let next = next.clone();
            let trace = trace.clone();

            Box::pin(async move {
                let settings = settings?;
                if settings.is_disabled() {
                    return next(request).await;
                }

                let attempts = Attempts {
                    settings: &settings,
                    parent: &request.context,
                    procedure: &request.procedure,
                    trace: &*trace,
                };
                let (response, _) = attempts
                    .run(0, |attempt, context| {
                        let mut retry = request.clone();
                        retry.headers = attempt_headers(&request.headers, &settings, attempt);
                        retry.context = context;
                        next(retry)
                    })
                    .await?;
                Ok(response)
            })
        },
    )
}
