//! CLI module for TMS AI.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// TMS AI - Logistics document question answering
///
/// Upload rate confirmations, bills of lading and other shipping documents,
/// ask questions about them and extract structured shipment data.
#[derive(Parser, Debug)]
#[command(name = "tms-ai")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host from the config)
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Port to bind to (defaults to server.port from the config)
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Upload and index a document (PDF, DOCX or TXT)
    Upload {
        /// Path to the document
        file: String,
    },

    /// Ask a question about an uploaded document
    Ask {
        /// Document ID returned by upload
        document_id: String,

        /// The question to ask
        question: String,
    },

    /// Extract structured shipment data from an uploaded document
    Extract {
        /// Document ID returned by upload
        document_id: String,

        /// Print the shipment data as JSON
        #[arg(long)]
        json: bool,
    },

    /// List uploaded documents
    List,

    /// Delete an uploaded document and its index
    Delete {
        /// Document ID to delete
        document_id: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
