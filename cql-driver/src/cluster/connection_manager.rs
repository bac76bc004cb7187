use derivative::Derivative;
use derive_more::Constructor;
use std::net::SocketAddr;
use std::sync::Arc;

#[cfg(test)]
use mockall::*;

use crate::error::{Error, Result};
use crate::frame::message_auth_response::BodyReqAuthResponse;
use crate::frame::message_credentials::BodyReqCredentials;
use crate::frame::message_query::BodyReqQuery;
use crate::frame::message_request::RequestBody;
use crate::frame::message_response::ResponseBody;
use crate::frame::message_startup::BodyReqStartup;
use crate::frame::Version;
use crate::future::BoxFuture;
use crate::query::QueryParams;
use crate::transport::Connection;

/// Manages establishing connections to hosts.
pub trait ConnectionManager: Send + Sync {
    /// Tries to establish a new, ready to use connection.
    fn connection<'a>(&'a self, addr: SocketAddr) -> BoxFuture<'a, Result<Arc<dyn Connection>>>;
}

#[cfg(test)]
mock! {
    pub ConnectionManager {
    }

    impl ConnectionManager for ConnectionManager {
        fn connection(&self, addr: SocketAddr) -> BoxFuture<'static, Result<Arc<dyn Connection>>>;
    }
}

/// Credentials for servers using password authentication.
#[derive(Clone, Constructor, Derivative, PartialEq, Eq)]
#[derivative(Debug)]
pub struct PlainTextCredentials {
    pub username: String,
    #[derivative(Debug = "ignore")]
    pub password: String,
}

/// Performs the protocol handshake: STARTUP, authentication if the server asks for it and
/// switching to given keyspace.
pub async fn startup(
    connection: &dyn Connection,
    credentials: Option<&PlainTextCredentials>,
    keyspace: Option<&str>,
) -> Result<()> {
    let response = connection
        .send(&RequestBody::Startup(BodyReqStartup::default()))
        .await?;

    match response.body {
        ResponseBody::Ready => {}
        ResponseBody::Authenticate(authenticate) => {
            let credentials = credentials.ok_or_else(|| {
                Error::General(format!(
                    "Server {} requires authentication with {}, but no credentials were provided",
                    connection.address(),
                    authenticate.authenticator
                ))
            })?;

            authenticate_plain_text(connection, credentials).await?;
        }
        body => return Err(Error::UnexpectedResponse(body.opcode())),
    }

    match keyspace {
        Some(keyspace) => use_keyspace(connection, keyspace).await,
        None => Ok(()),
    }
}

async fn authenticate_plain_text(
    connection: &dyn Connection,
    credentials: &PlainTextCredentials,
) -> Result<()> {
    let request = if connection.version() == Version::V1 {
        RequestBody::Credentials(BodyReqCredentials::plain_text(
            &credentials.username,
            &credentials.password,
        ))
    } else {
        RequestBody::AuthResponse(BodyReqAuthResponse::plain_text(
            &credentials.username,
            &credentials.password,
        ))
    };

    let response = connection.send(&request).await?;
    match response.body {
        ResponseBody::AuthSuccess(_) | ResponseBody::Ready => Ok(()),
        // password authentication has a single step
        body => Err(Error::UnexpectedResponse(body.opcode())),
    }
}

async fn use_keyspace(connection: &dyn Connection, keyspace: &str) -> Result<()> {
    let query = format!("USE \"{}\"", keyspace.replace('"', "\"\""));
    connection
        .send(&RequestBody::Query(BodyReqQuery::new(
            query,
            QueryParams::default(),
        )))
        .await?
        .into_body()
        .into_set_keyspace()
        .map(|_| ())
        .ok_or_else(|| Error::General(format!("Cannot use keyspace: {keyspace}")))
}
