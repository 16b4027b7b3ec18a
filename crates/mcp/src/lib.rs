//! Homekey MCP (Model Context Protocol) Server
//!
//! This crate is the tool gateway for the offer subsystem: it lets AI agent
//! runtimes submit offers, respond to them, and inspect per-property
//! statistics over MCP stdio.

mod server;

pub use server::HomekeyMcpServer;
