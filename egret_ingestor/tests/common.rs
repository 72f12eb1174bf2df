use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use egret_core::{
    ImportOptions, InMemoryClusterTopology, NodeAddress,
    resources::{
        Field, FieldName, FieldOptions, FieldRef, Index, IndexName, IndexOptions, IndexRef,
    },
};
use egret_ingestor::{
    ConstantBackoff, ImportDispatcher, ImportTransport, RecordIngestor, RecordIngestorClient,
    TransportError,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One call observed by the mock transport, successful or not.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub address: String,
    pub path: String,
    pub body: Bytes,
}

/// A transport that records every call and fails on demand.
#[derive(Debug, Default)]
pub struct MockTransport {
    calls: Mutex<Vec<RecordedCall>>,
    failing: Mutex<HashSet<String>>,
    rejection: Mutex<Option<(u16, String)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every call to the given address fail at the transport level.
    pub fn fail_address(&self, address: &NodeAddress) {
        self.failing
            .lock()
            .unwrap()
            .insert(address.uri().to_string());
    }

    /// Make the server reject every payload with the given status.
    pub fn reject_with(&self, status: u16, message: &str) {
        *self.rejection.lock().unwrap() = Some((status, message.to_string()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImportTransport for MockTransport {
    async fn post(
        &self,
        address: &NodeAddress,
        path: &str,
        _headers: &[(&str, &str)],
        body: Bytes,
    ) -> Result<Bytes, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            address: address.uri().to_string(),
            path: path.to_string(),
            body,
        });

        if self.failing.lock().unwrap().contains(address.uri()) {
            return Err(TransportError::Connection {
                message: "connection refused".to_string(),
            });
        }

        if let Some((status, message)) = self.rejection.lock().unwrap().clone() {
            return Err(TransportError::Status { status, message });
        }

        Ok(Bytes::new())
    }
}

pub fn node_addresses() -> Vec<NodeAddress> {
    vec![
        NodeAddress::new("http://node-a:10101"),
        NodeAddress::new("http://node-b:10101"),
        NodeAddress::new("http://node-c:10101"),
    ]
}

pub fn create_record_ingestor(
    options: ImportOptions,
    transport: Arc<MockTransport>,
) -> (
    JoinHandle<()>,
    RecordIngestorClient,
    Arc<InMemoryClusterTopology>,
    CancellationToken,
) {
    let topology: Arc<_> = InMemoryClusterTopology::new(node_addresses()).into();
    let dispatcher = ImportDispatcher::new(topology.clone(), transport)
        .with_backoff(ConstantBackoff::new(Duration::from_millis(1)));
    let ingestor = RecordIngestor::new(dispatcher, options);

    let client = ingestor.client();
    let ct = CancellationToken::new();
    let task = tokio::spawn({
        let ct = ct.clone();
        async move {
            ingestor.run(ct).await.expect("ingestor run");
        }
    });

    (task, client, topology, ct)
}

pub fn test_index() -> IndexRef {
    let name = IndexName::new_unchecked("repository");
    Arc::new(Index::new(name, IndexOptions::new()))
}

pub fn test_field(index: &IndexRef, options: FieldOptions) -> FieldRef {
    let name = FieldName::new_unchecked("stargazer", index.name.clone());
    Arc::new(Field::new(name, options))
}
