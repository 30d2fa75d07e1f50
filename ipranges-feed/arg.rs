//! Command line arguments parsing.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::amazon::AMAZON_URL;
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct IpRangesFeed {
    /// Directory to write the group documents into
    #[arg(short = 'o', long, default_value = ".")]
    pub output_dir: PathBuf,
    /// Address of the Amazon IP ranges feed
    #[arg(short = 'u', long, default_value = AMAZON_URL)]
    pub url: String,
    /// Addresses to look up once the ranges are loaded
    pub addresses: Vec<IpAddr>,
    /// Verbose mode
    #[arg(short = 'v', long)]
    pub verbose: bool,
    /// Dry-run mode: download, parse, and print the group, then exit
    #[arg(short = 'i', long)]
    pub dry_run: bool,
}
