//! CLI module - Command-line interface for jyotish
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// jyotish - chart cache server for Vedic astrology computations
#[derive(Parser)]
#[command(name = "jyotish")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API and the background cache sweep
    #[command(alias = "daemon")]
    Serve,

    /// Create a default config file
    #[command(alias = "--init")]
    Init,

    /// Delete long-expired cache rows once and exit
    Sweep,

    /// Manage API users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user and print their API key
    Add {
        /// Unique username
        username: String,
    },

    /// List all users
    #[command(alias = "ls")]
    List,

    /// Replace a user's API key
    RotateKey {
        username: String,
    },
}

pub use commands::*;
