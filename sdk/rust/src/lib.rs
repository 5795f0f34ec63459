//! Client for the rpc-service JSON RPC endpoint.

mod client;

pub use client::{ClientError, EchoResponse, RpcClient, RpcReply, RPC_PATH};
