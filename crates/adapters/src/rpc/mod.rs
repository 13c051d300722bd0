// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RPCClient` capability (§4.3) and its wire transport (§6).

mod client;
mod messages;
mod tcp;
pub mod wire;

pub use client::{RpcError, TaskStreamReader, TaskStreamWriter, RPCClient};
pub use messages::{
    RegisterRequest, RegisterResponse, ReportInventoryRequest, ReportInventoryResponse,
    StreamClientMsg, StreamServerMsg,
};
pub use tcp::TcpRpcClient;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRPCClient, RecordedSend};
