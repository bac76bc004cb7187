use std::sync::Arc;
use tracing::*;

use crate::cluster::request_handler::HandlerInner;
use crate::cluster::topology::Host;
use crate::error::{Error, Result};
use crate::frame::message_error::{AdditionalErrorInfo, ErrorBody};
use crate::frame::message_prepare::BodyReqPrepare;
use crate::frame::message_request::RequestBody;
use crate::frame::message_response::ResponseBody;
use crate::frame::message_result::ResResultBody;
use crate::frame::{Flags, ProtocolFeature, Response};
use crate::retry::RetryDecision;
use crate::transport::Connection;
use crate::types::CBytesShort;

/// What an execution does after a host failed to serve the request.
enum Outcome {
    /// The request reached a final state on this execution.
    Done,
    NextHost,
}

/// A single execution of a request: walks the shared query plan until it gets a response or a
/// terminal error. Several executions of one request may run at once.
pub(crate) struct RequestExecution {
    handler: Arc<HandlerInner>,
    request: RequestBody,
    retry_count: usize,
}

impl RequestExecution {
    pub(crate) fn new(handler: Arc<HandlerInner>, request: RequestBody) -> Self {
        RequestExecution {
            handler,
            request,
            retry_count: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        while let Some(host) = self.handler.next_host().await {
            if let Outcome::Done = self.execute_on(&host).await {
                break;
            }
        }

        self.handler.execution_finished();
    }

    async fn execute_on(&mut self, host: &Arc<Host>) -> Outcome {
        let connection = match self.handler.pool.borrow_connection(host).await {
            Ok(connection) => connection,
            Err(error) => {
                self.handler.record_host_error(host, error);
                return Outcome::NextHost;
            }
        };

        let mut reprepared = false;

        loop {
            if self.handler.is_completed() {
                return Outcome::Done;
            }

            let error = match connection.send(&self.request).await {
                Ok(response) => {
                    self.handler.complete(Ok(response));
                    return Outcome::Done;
                }
                Err(error) => error,
            };

            let body = match &error {
                Error::Server { body, .. } => body,
                Error::ConnectionClosed(_) => {
                    // the request was never written, so any statement can go elsewhere
                    self.handler.pool.mark_down(host);
                    self.handler.record_host_error(host, error);
                    return Outcome::NextHost;
                }
                Error::Io(_) | Error::Timeout(_) => {
                    if matches!(error, Error::Io(_)) {
                        self.handler.pool.mark_down(host);
                    }

                    return self.fail_over_if_idempotent(host, error);
                }
                _ => return self.fail(error),
            };

            match &body.additional_info {
                AdditionalErrorInfo::Unprepared(unprepared) if !reprepared => {
                    reprepared = true;
                    if let Err(error) = self.reprepare(connection.as_ref(), &unprepared.id).await {
                        self.handler.record_host_error(host, error);
                        return Outcome::NextHost;
                    }
                }
                AdditionalErrorInfo::Overloaded
                | AdditionalErrorInfo::IsBootstrapping
                | AdditionalErrorInfo::Server => {
                    warn!(address = %host.address(), %error, "Host cannot serve requests.");
                    self.handler.avoid_host(host);
                    self.handler.record_host_error(host, error);
                    return Outcome::NextHost;
                }
                AdditionalErrorInfo::ReadTimeout(_)
                | AdditionalErrorInfo::WriteTimeout(_)
                | AdditionalErrorInfo::Unavailable(_) => match self.retry_decision(body) {
                    RetryDecision::Retry(consistency) => {
                        debug!(
                            address = %host.address(),
                            %consistency,
                            retry_count = self.retry_count,
                            "Retrying request."
                        );

                        self.request.set_consistency(consistency);
                        self.retry_count += 1;
                    }
                    RetryDecision::Ignore => {
                        self.handler.complete(Ok(self.void_response(&connection)));
                        return Outcome::Done;
                    }
                    RetryDecision::Rethrow => return self.fail(error),
                },
                _ => return self.fail(error),
            }
        }
    }

    fn retry_decision(&self, body: &ErrorBody) -> RetryDecision {
        let statement = &self.handler.statement;
        let retry_policy = &self.handler.retry_policy;

        match &body.additional_info {
            AdditionalErrorInfo::ReadTimeout(error) => retry_policy.on_read_timeout(
                statement,
                error.consistency,
                error.required,
                error.received,
                error.data_retrieved,
                self.retry_count,
            ),
            AdditionalErrorInfo::WriteTimeout(error) => retry_policy.on_write_timeout(
                statement,
                error.consistency,
                error.write_type,
                error.required,
                error.received,
                self.retry_count,
            ),
            AdditionalErrorInfo::Unavailable(error) => retry_policy.on_unavailable(
                statement,
                error.consistency,
                error.required,
                error.alive,
                self.retry_count,
            ),
            _ => RetryDecision::Rethrow,
        }
    }

    /// Prepares the statement again on given connection, after the host lost it.
    async fn reprepare(&self, connection: &dyn Connection, id: &CBytesShort) -> Result<()> {
        let prepared = self
            .handler
            .statement
            .prepared_statement(id)
            .ok_or_else(|| Error::General(format!("Unknown prepared statement id: {id:?}")))?;

        debug!(address = %connection.address(), query = prepared.query(), "Re-preparing statement.");

        let keyspace = prepared
            .keyspace()
            .filter(|_| {
                connection
                    .version()
                    .supports(ProtocolFeature::KeyspaceInRequest)
            })
            .map(str::to_string);

        let response = connection
            .send(&RequestBody::Prepare(BodyReqPrepare::new(
                prepared.query().to_string(),
                keyspace,
            )))
            .await?;

        let opcode = response.opcode();
        let result = response
            .into_body()
            .into_prepared()
            .ok_or(Error::UnexpectedResponse(opcode))?;

        if result.id != *id {
            warn!(
                query = prepared.query(),
                "Statement re-prepared with a different id."
            );
        }

        Ok(())
    }

    fn fail_over_if_idempotent(&self, host: &Host, error: Error) -> Outcome {
        // the request might have been applied, so only idempotent statements are safe to resend
        if self.handler.statement.is_idempotent() {
            self.handler.record_host_error(host, error);
            Outcome::NextHost
        } else {
            self.fail(error)
        }
    }

    fn fail(&self, error: Error) -> Outcome {
        debug!(%error, "Execution failed.");
        self.handler.record_final_error(error);
        Outcome::Done
    }

    fn void_response(&self, connection: &Arc<dyn Connection>) -> Response {
        Response {
            version: connection.version(),
            flags: Flags::empty(),
            stream_id: 0,
            tracing_id: None,
            warnings: vec![],
            custom_payload: vec![],
            body: ResponseBody::Result(ResResultBody::Void),
        }
    }
}
