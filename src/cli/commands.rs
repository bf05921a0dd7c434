//! CLI command definitions using clap.
//!
//! - serve: run the MCP server on stdio or HTTP
//! - tools: list the tools of a surface
//! - call: invoke one tool and print its text

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// memory-gateway - expose a knowledge-graph memory service as MCP tools
#[derive(Parser, Debug)]
#[command(name = "memory-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute (defaults to serve)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve MCP over stdin/stdout or HTTP
    Serve {
        /// Tool surface to expose (user, admin, all)
        #[arg(short, long)]
        surface: Option<String>,

        /// Session id sent with every backend request
        #[arg(long)]
        session_id: Option<String>,

        /// Transport (stdio, http)
        #[arg(short, long)]
        transport: Option<String>,

        /// HTTP bind address
        #[arg(long)]
        host: Option<String>,

        /// HTTP port for the user surface
        #[arg(short, long)]
        port: Option<u16>,

        /// HTTP port for the admin surface
        #[arg(long)]
        admin_port: Option<u16>,

        /// HTTP endpoint path
        #[arg(long)]
        path: Option<String>,
    },

    /// List available tools
    Tools {
        /// Tool surface to list (user, admin, all)
        #[arg(short, long)]
        surface: Option<String>,
    },

    /// Call a single tool and print the result
    Call {
        /// Tool name
        tool: String,

        /// Arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,

        /// Session id sent with every backend request
        #[arg(long)]
        session_id: Option<String>,
    },
}
