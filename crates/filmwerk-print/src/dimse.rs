// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DIMSE messages exchanged with a peer and the transport seam.
//
// PDU encoding, association state and presentation-context bookkeeping live
// behind `AssociationTransport`; the print service only sees decoded
// requests and produces typed responses.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::TcpStream;

use filmwerk_core::dataset::{Dataset, Tag};
use filmwerk_core::error::Result;
use filmwerk_core::protocol::DimseStatus;

// ---------------------------------------------------------------------------
// Association
// ---------------------------------------------------------------------------

/// A presentation context proposed by the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationContext {
    pub id: u8,
    pub abstract_syntax: String,
    /// Proposed transfer syntaxes in the peer's order of preference.
    pub transfer_syntaxes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationRequest {
    pub calling_ae: String,
    pub called_ae: String,
    pub presentation_contexts: Vec<PresentationContext>,
}

/// Outcome for one proposed presentation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextResult {
    Accepted { transfer_syntax: String },
    AbstractSyntaxNotSupported,
    TransferSyntaxesNotSupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationAccept {
    /// `(presentation context id, result)` in proposal order.
    pub contexts: Vec<(u8, ContextResult)>,
}

impl AssociationAccept {
    pub fn is_accepted(&self, context_id: u8) -> bool {
        self.contexts
            .iter()
            .any(|(id, result)| *id == context_id && matches!(result, ContextResult::Accepted { .. }))
    }
}

// ---------------------------------------------------------------------------
// DIMSE requests and responses
// ---------------------------------------------------------------------------

/// A decoded DIMSE request.
#[derive(Debug, Clone, PartialEq)]
pub struct DimseRequest {
    pub message_id: u16,
    /// Abstract syntax of the presentation context the request arrived on.
    pub abstract_syntax: Option<String>,
    pub command: DimseCommand,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DimseCommand {
    CEcho,
    NCreate {
        sop_class_uid: String,
        /// `None` lets this provider assign the instance UID.
        sop_instance_uid: Option<String>,
        dataset: Dataset,
    },
    NSet {
        sop_class_uid: String,
        sop_instance_uid: String,
        dataset: Dataset,
    },
    NDelete {
        sop_class_uid: String,
        sop_instance_uid: String,
    },
    NGet {
        sop_class_uid: String,
        sop_instance_uid: String,
        /// Attribute Identifier List; empty means "all".
        attributes: Vec<Tag>,
    },
    NAction {
        sop_class_uid: String,
        sop_instance_uid: String,
        action_type_id: u16,
    },
}

impl DimseCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CEcho => "C-ECHO",
            Self::NCreate { .. } => "N-CREATE",
            Self::NSet { .. } => "N-SET",
            Self::NDelete { .. } => "N-DELETE",
            Self::NGet { .. } => "N-GET",
            Self::NAction { .. } => "N-ACTION",
        }
    }

    pub fn sop_class_uid(&self) -> Option<&str> {
        match self {
            Self::CEcho => None,
            Self::NCreate { sop_class_uid, .. }
            | Self::NSet { sop_class_uid, .. }
            | Self::NDelete { sop_class_uid, .. }
            | Self::NGet { sop_class_uid, .. }
            | Self::NAction { sop_class_uid, .. } => Some(sop_class_uid),
        }
    }
}

/// Response to a [`DimseRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct DimseResponse {
    pub message_id_being_responded_to: u16,
    pub status: DimseStatus,
    pub affected_sop_class_uid: Option<String>,
    pub affected_sop_instance_uid: Option<String>,
    pub dataset: Option<Dataset>,
}

impl DimseResponse {
    pub fn new(request: &DimseRequest, status: DimseStatus) -> Self {
        Self {
            message_id_being_responded_to: request.message_id,
            status,
            affected_sop_class_uid: request.command.sop_class_uid().map(str::to_string),
            affected_sop_instance_uid: None,
            dataset: None,
        }
    }

    pub fn with_instance(mut self, sop_instance_uid: impl Into<String>) -> Self {
        self.affected_sop_instance_uid = Some(sop_instance_uid.into());
        self
    }

    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = Some(dataset);
        self
    }
}

/// N-EVENT-REPORT request sent by this provider.
#[derive(Debug, Clone, PartialEq)]
pub struct EventReport {
    pub message_id: u16,
    pub sop_class_uid: String,
    pub sop_instance_uid: String,
    pub event_type_id: u16,
    pub dataset: Dataset,
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// What the peer did.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    AssociationRequest(AssociationRequest),
    Request(DimseRequest),
    ReleaseRequest,
    Abort { source: u8, reason: u8 },
}

/// What this provider sends.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    AssociationAccept(AssociationAccept),
    Response(DimseResponse),
    EventReport(EventReport),
    ReleaseResponse,
    Abort,
}

/// One association with a peer.
#[async_trait]
pub trait PeerConnection: Send {
    /// Next event from the peer; `None` once the connection is closed.
    async fn receive(&mut self) -> Result<Option<PeerEvent>>;

    async fn send(&mut self, message: OutboundMessage) -> Result<()>;
}

/// Upper-layer protocol codec: turns accepted sockets into associations.
#[async_trait]
pub trait AssociationTransport: Send + Sync + 'static {
    type Connection: PeerConnection + 'static;

    async fn accept(&self, stream: TcpStream, peer: SocketAddr) -> Result<Self::Connection>;
}
