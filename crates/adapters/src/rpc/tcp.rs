// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference `RPCClient` transport: the length-prefixed JSON framing from
//! [`crate::rpc::wire`] carried over a plain TCP connection. Registration
//! and inventory upload are request/response round trips over their own
//! short-lived connections; the task-notification stream holds one
//! connection open for its lifetime (§4.3, §6).
//!
//! The concrete gRPC client bindings this stands in for are out of scope
//! (§1); swapping transports means providing a different `RPCClient` impl,
//! nothing in `fleet-agentd`'s task loop or backoff logic changes.

use async_trait::async_trait;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use super::client::{RpcError, TaskStreamReader, TaskStreamWriter, RPCClient};
use super::messages::{
    RegisterRequest, RegisterResponse, ReportInventoryRequest, ReportInventoryResponse,
    StreamClientMsg, StreamServerMsg,
};
use super::wire::{decode, encode, read_frame, write_frame, ProtocolError};
use fleet_core::{InventoryReport, TaskComplete, TaskNotification, TaskProgress};

impl From<ProtocolError> for RpcError {
    fn from(e: ProtocolError) -> Self {
        RpcError::Transport(e.to_string())
    }
}

pub struct TcpRpcClient {
    addr: String,
    agent_version: String,
}

impl TcpRpcClient {
    pub fn new(addr: impl Into<String>, agent_version: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            agent_version: agent_version.into(),
        }
    }

    async fn connect(&self) -> Result<TcpStream, RpcError> {
        TcpStream::connect(&self.addr)
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))
    }
}

#[async_trait]
impl RPCClient for TcpRpcClient {
    async fn register(&self, project_id: &str, instance_name: &str) -> Result<(), RpcError> {
        let mut stream = self.connect().await?;
        let req = RegisterRequest {
            project_id: project_id.to_string(),
            instance_name: instance_name.to_string(),
            agent_version: self.agent_version.clone(),
        };
        write_frame(&mut stream, &encode(&req)?).await?;
        let bytes = read_frame(&mut stream).await?;
        let response: RegisterResponse = decode(&bytes)?;
        if response.accepted {
            Ok(())
        } else {
            Err(RpcError::Transport("registration rejected".to_string()))
        }
    }

    async fn report_inventory(&self, report: &InventoryReport) -> Result<(), RpcError> {
        let mut stream = self.connect().await?;
        let req = ReportInventoryRequest {
            project_id: report.host.os_short_name.clone(),
            instance_name: String::new(),
            report: report.clone(),
        };
        write_frame(&mut stream, &encode(&req)?).await?;
        let bytes = read_frame(&mut stream).await?;
        let response: ReportInventoryResponse = decode(&bytes)?;
        if response.accepted {
            Ok(())
        } else {
            Err(RpcError::Transport("inventory report rejected".to_string()))
        }
    }

    async fn open_task_stream(
        &self,
        project_id: &str,
        instance_name: &str,
    ) -> Result<(Box<dyn TaskStreamReader>, Box<dyn TaskStreamWriter>), RpcError> {
        let mut stream = self.connect().await?;
        let hello = StreamClientMsg::Hello {
            project_id: project_id.to_string(),
            instance_name: instance_name.to_string(),
        };
        write_frame(&mut stream, &encode(&hello)?).await?;
        let (read_half, write_half) = stream.into_split();
        Ok((
            Box::new(TcpTaskStreamReader { read_half }),
            Box::new(TcpTaskStreamWriter { write_half }),
        ))
    }
}

struct TcpTaskStreamReader {
    read_half: OwnedReadHalf,
}

#[async_trait]
impl TaskStreamReader for TcpTaskStreamReader {
    async fn recv(&mut self) -> Result<Option<TaskNotification>, RpcError> {
        match read_frame(&mut self.read_half).await {
            Ok(bytes) => {
                let msg: StreamServerMsg = decode(&bytes)?;
                let StreamServerMsg::TaskStart(notification) = msg;
                Ok(Some(notification))
            }
            Err(ProtocolError::ConnectionClosed) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

struct TcpTaskStreamWriter {
    write_half: OwnedWriteHalf,
}

#[async_trait]
impl TaskStreamWriter for TcpTaskStreamWriter {
    async fn send_progress(&mut self, progress: TaskProgress) -> Result<(), RpcError> {
        let msg = StreamClientMsg::Progress(progress);
        write_frame(&mut self.write_half, &encode(&msg)?).await?;
        Ok(())
    }

    async fn send_complete(&mut self, complete: TaskComplete) -> Result<(), RpcError> {
        let msg = StreamClientMsg::Complete(complete);
        write_frame(&mut self.write_half, &encode(&msg)?).await?;
        Ok(())
    }
}
