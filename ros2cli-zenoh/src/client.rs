//! Service client.
//!
//! Requests are Zenoh queries on `<domain>/<service>/<type>/<hash>` carrying
//! the CDR request as payload and an [`Attachment`]; the server echoes the
//! sequence number back in its reply attachment.
//!
//! The client does not know type hashes up front. It reads the key expression
//! of the live server from the graph, which also tells whether the service
//! speaks the expected type.
//!
//! # Reference
//!
//! See [rmw_zenoh design - Service Clients](https://github.com/ros2/rmw_zenoh/blob/rolling/docs/design.md#service-clients)

use crate::{
    attachment::{Attachment, GID_SIZE, generate_gid},
    cdr::{from_cdr, to_cdr},
    context::Context,
    error::{Error, Result},
    msgs::ServiceType,
};
use ros2cli_core::{GraphCache, keyexpr::topic_keyexpr};
use std::{
    marker::PhantomData,
    sync::atomic::{AtomicI64, Ordering},
    time::Duration,
};
use zenoh::{bytes::ZBytes, query::QueryTarget};

/// Service client bound to one service of a known type.
///
/// # Example
///
/// ```ignore
/// let graph = ctx.graph().await?;
/// let client = Client::<GetState>::new(&ctx, &graph, "/talker/get_state")?;
/// let response = client.call(&Empty, Duration::from_secs(5)).await?;
/// ```
pub struct Client<'a, S: ServiceType> {
    context: &'a Context,
    service_name: String,
    key_expr: String,
    gid: [u8; GID_SIZE],
    sequence_number: AtomicI64,
    _phantom: PhantomData<S>,
}

impl<'a, S: ServiceType> Client<'a, S> {
    /// Create a client for a service currently served in the graph.
    ///
    /// # Errors
    ///
    /// - `ServiceNotAvailable` if nobody serves `service_name`
    /// - `ServiceTypeMismatch` if the server speaks another type
    pub fn new(context: &'a Context, graph: &GraphCache, service_name: &str) -> Result<Self> {
        let servers = graph.get_servers_info(service_name);
        let Some(server) = servers.first() else {
            return Err(Error::ServiceNotAvailable(service_name.to_string()));
        };

        let actual = server.ros_type().unwrap_or_default();
        if actual != S::TYPE_NAME {
            return Err(Error::ServiceTypeMismatch {
                service: service_name.to_string(),
                expected: S::TYPE_NAME.to_string(),
                actual,
            });
        }

        let key_expr = topic_keyexpr(
            context.domain_id(),
            service_name,
            server.type_name.as_deref().unwrap_or_default(),
            server.type_hash.as_deref().unwrap_or_default(),
        );
        tracing::debug!(service = service_name, key_expr, "service client ready");

        Ok(Self {
            context,
            service_name: service_name.to_string(),
            key_expr,
            gid: generate_gid(),
            sequence_number: AtomicI64::new(1),
            _phantom: PhantomData,
        })
    }

    /// Get the service name.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Send a request and wait for the matching reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails, no reply arrives within
    /// `timeout`, the reply has no valid attachment, or decoding fails.
    pub async fn call(&self, request: &S::Request, timeout: Duration) -> Result<S::Response> {
        match tokio::time::timeout(timeout, self.call_inner(request, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn call_inner(&self, request: &S::Request, timeout: Duration) -> Result<S::Response> {
        let payload = to_cdr(request);
        let seq = self.sequence_number.fetch_add(1, Ordering::AcqRel);
        let attachment = Attachment::new(seq, self.gid);

        let replies = self
            .context
            .session()
            .get(&self.key_expr)
            .payload(payload)
            .attachment(ZBytes::from(attachment.to_bytes().to_vec()))
            .target(QueryTarget::AllComplete)
            .timeout(timeout)
            .await?;

        loop {
            let reply = replies.recv_async().await.map_err(|_| Error::Timeout)?;
            let sample = reply
                .result()
                .map_err(|e| Error::Reply(format!("{e:?}")))?;
            let reply_attachment = sample.attachment().ok_or(Error::MissingAttachment)?;
            let reply_attachment = Attachment::from_bytes(&reply_attachment.to_bytes())?;
            if reply_attachment.sequence_number != seq {
                tracing::trace!(
                    expected = seq,
                    got = reply_attachment.sequence_number,
                    "skipping reply for another request"
                );
                continue;
            }
            return from_cdr(&sample.payload().to_bytes());
        }
    }
}
