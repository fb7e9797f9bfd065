//! CLI module for customer management.
//!
//! This module provides the command-line interface for administering the
//! customer collection directly against the store. It can be used either as
//! a standalone binary or as the `customers` subcommand of the unified
//! subgate CLI.
//!
//! # Usage
//!
//! ```bash
//! # Create a customer with placeholder nodes
//! subgate customers create --name "Acme Corp"
//!
//! # Create with real share links
//! subgate customers create --name "Acme Corp" \
//!     --primary-share "ss://..." --backup-share "socks5://host:1080"
//!
//! # List all customers
//! subgate customers list
//!
//! # Rotate a token
//! subgate customers rotate --token <token>
//!
//! # Point a slot at an emergency endpoint
//! subgate customers set-override --token <token> --primary-share "ss://..."
//! subgate customers clear-override --token <token>
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tabled::{Table, Tabled};

use crate::manager::{CustomerManager, NewCustomer, SubscribeUrls};
use crate::record::{CustomerPatch, CustomerRecord, Node, NodeGroup, OverrideNodes};
use crate::store::RecordStore;

/// Customer management CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "subgate-customers",
    version,
    about = "Manage subgate customers"
)]
pub struct CustomerArgs {
    /// Customer collection document path.
    #[arg(
        short,
        long,
        env = "SUBGATE_STORAGE",
        default_value = "config/customers.yml"
    )]
    pub storage: PathBuf,

    /// Base URL used when printing subscribe links.
    #[arg(long, env = "SUBGATE_BASE_URL", default_value = "http://localhost:8000")]
    pub base_url: String,

    #[command(subcommand)]
    pub command: CustomerCommands,
}

/// Customer CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum CustomerCommands {
    /// Create a new customer and print its token and subscribe links.
    Create {
        /// Customer name.
        #[arg(short, long)]
        name: String,

        /// Primary share link (placeholder when omitted).
        #[arg(long)]
        primary_share: Option<String>,

        /// Backup share link (placeholder when omitted).
        #[arg(long)]
        backup_share: Option<String>,

        /// Where the endpoint addresses come from (provider note).
        #[arg(long)]
        ip_source: Option<String>,

        /// Free-form remark.
        #[arg(long)]
        remark: Option<String>,

        /// Display name override for the primary slot.
        #[arg(long)]
        primary_display_name: Option<String>,

        /// Display name override for the backup slot.
        #[arg(long)]
        backup_display_name: Option<String>,
    },

    /// List all customers.
    List {
        /// Output format (table, json).
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show one customer in full.
    Show {
        /// Customer token.
        #[arg(short, long)]
        token: String,
    },

    /// Rotate a customer's token.
    Rotate {
        /// Current token.
        #[arg(short, long)]
        token: String,
    },

    /// Set an emergency override for one or both slots.
    SetOverride {
        /// Customer token.
        #[arg(short, long)]
        token: String,

        /// Primary override share link.
        #[arg(long)]
        primary_share: Option<String>,

        /// JSON file with a manual descriptor for the primary override.
        #[arg(long, requires = "primary_share")]
        primary_descriptor: Option<PathBuf>,

        /// Backup override share link.
        #[arg(long)]
        backup_share: Option<String>,

        /// JSON file with a manual descriptor for the backup override.
        #[arg(long, requires = "backup_share")]
        backup_descriptor: Option<PathBuf>,

        /// Note explaining the override.
        #[arg(long)]
        note: Option<String>,
    },

    /// Clear a customer's override.
    ClearOverride {
        /// Customer token.
        #[arg(short, long)]
        token: String,
    },

    /// Enable a customer's subscription.
    Enable {
        /// Customer token.
        #[arg(short, long)]
        token: String,
    },

    /// Disable a customer's subscription.
    Disable {
        /// Customer token.
        #[arg(short, long)]
        token: String,
    },

    /// Delete a customer.
    Delete {
        /// Customer token.
        #[arg(short, long)]
        token: String,
    },
}

/// Customer row for table display.
#[derive(Tabled)]
struct CustomerDisplay {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Override")]
    has_override: String,
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Updated")]
    updated_at: String,
}

/// Run the customer CLI with the given arguments.
///
/// This is the main entry point, used by both the standalone binary and
/// the unified subgate CLI.
pub fn run(args: CustomerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = RecordStore::open(&args.storage)?;
    let manager = CustomerManager::new(store);
    let base_url = args.base_url;

    match args.command {
        CustomerCommands::Create {
            name,
            primary_share,
            backup_share,
            ip_source,
            remark,
            primary_display_name,
            backup_display_name,
        } => {
            let placeholders = primary_share.is_none() && backup_share.is_none();
            let nodes = NodeGroup {
                primary: primary_share.map(Node::new).unwrap_or_else(placeholder_primary),
                backup: backup_share.map(Node::new).unwrap_or_else(placeholder_backup),
            };
            let record = manager.create(NewCustomer {
                ip_source,
                remark,
                primary_display_name,
                backup_display_name,
                ..NewCustomer::new(name, nodes)
            })?;

            println!("Customer created successfully.");
            println!("  Name: {}", record.name);
            println!("  Token: {}", record.token);
            print_subscribe_urls(&base_url, &record.token);
            if placeholders {
                println!();
                println!("Note: placeholder nodes were stored; update them before handing out the links.");
            }
        }

        CustomerCommands::List { format } => {
            let records = manager.list()?;
            if records.is_empty() {
                println!("No customers found.");
                return Ok(());
            }
            match format.as_str() {
                "json" => {
                    let items: Vec<_> = records
                        .iter()
                        .map(|r| {
                            serde_json::json!({
                                "token": r.token,
                                "name": r.name,
                                "enabled": r.enabled,
                                "has_override": r.has_override(),
                                "subscribe_urls": SubscribeUrls::new(&base_url, &r.token),
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&items)?);
                }
                _ => {
                    let rows: Vec<_> = records
                        .iter()
                        .map(|r| CustomerDisplay {
                            name: r.name.clone(),
                            enabled: if r.enabled { "yes" } else { "no" }.to_string(),
                            has_override: if r.has_override() { "yes" } else { "" }.to_string(),
                            token: r.token.clone(),
                            updated_at: r.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                        })
                        .collect();
                    println!("{}", Table::new(rows));
                }
            }
        }

        CustomerCommands::Show { token } => {
            let record = manager.get(&token)?.ok_or("customer not found")?;
            print_record(&record);
            print_subscribe_urls(&base_url, &record.token);
        }

        CustomerCommands::Rotate { token } => {
            let rotated = manager.rotate(&token)?;
            println!("Token rotated successfully.");
            println!("  Customer: {}", rotated.record.name);
            println!("  Old token: {}", rotated.old_token);
            println!("  New token: {}", rotated.new_token);
            print_subscribe_urls(&base_url, &rotated.new_token);
        }

        CustomerCommands::SetOverride {
            token,
            primary_share,
            primary_descriptor,
            backup_share,
            backup_descriptor,
            note,
        } => {
            let override_nodes = OverrideNodes {
                primary: override_node(primary_share, primary_descriptor.as_deref())?,
                backup: override_node(backup_share, backup_descriptor.as_deref())?,
                note,
            };
            let record = manager.set_override(&token, override_nodes)?;
            println!("Override set successfully.");
            println!("  Customer: {}", record.name);
            if let Some(o) = &record.override_nodes {
                if let Some(primary) = &o.primary {
                    println!("  Primary: {}", primary.share);
                }
                if let Some(backup) = &o.backup {
                    println!("  Backup: {}", backup.share);
                }
                if let Some(note) = &o.note {
                    println!("  Note: {}", note);
                }
            }
        }

        CustomerCommands::ClearOverride { token } => {
            let record = manager.clear_override(&token)?;
            println!("Override cleared successfully.");
            println!("  Customer: {}", record.name);
        }

        CustomerCommands::Enable { token } => {
            let record = manager.update(
                &token,
                &CustomerPatch {
                    enabled: Some(true),
                    ..Default::default()
                },
            )?;
            println!("Customer enabled: {}", record.name);
        }

        CustomerCommands::Disable { token } => {
            let record = manager.update(
                &token,
                &CustomerPatch {
                    enabled: Some(false),
                    ..Default::default()
                },
            )?;
            println!("Customer disabled: {}", record.name);
        }

        CustomerCommands::Delete { token } => {
            if manager.delete(&token)? {
                println!("Customer deleted successfully.");
            } else {
                println!("No customer found under that token.");
            }
        }
    }

    Ok(())
}

/// Build an override node from an optional share link plus an optional
/// manual descriptor file (JSON, as accepted by the structured renderer).
fn override_node(
    share: Option<String>,
    descriptor_path: Option<&std::path::Path>,
) -> Result<Option<Node>, Box<dyn std::error::Error>> {
    let Some(share) = share else {
        return Ok(None);
    };
    let descriptor = match descriptor_path {
        Some(path) => {
            let data = std::fs::read_to_string(path)?;
            Some(serde_json::from_str(&data)?)
        }
        None => None,
    };
    Ok(Some(Node { share, descriptor }))
}

fn placeholder_primary() -> Node {
    Node::new("ss://YWVzLTI1Ni1nY206cGxhY2Vob2xkZXI=@placeholder.example.com:8388")
}

fn placeholder_backup() -> Node {
    Node::new("socks5://placeholder.example.com:1080")
}

fn print_subscribe_urls(base_url: &str, token: &str) {
    let urls = SubscribeUrls::new(base_url, token);
    println!("  v2rayN: {}", urls.v2rayn);
    println!("  Clash:  {}", urls.clash);
}

fn print_record(record: &CustomerRecord) {
    println!("Name: {}", record.name);
    println!("Token: {}", record.token);
    println!("Enabled: {}", record.enabled);
    println!("Primary: {}", record.nodes.primary.share);
    println!("Backup: {}", record.nodes.backup.share);
    if let Some(o) = &record.override_nodes {
        println!("Override:");
        if let Some(primary) = &o.primary {
            println!("  Primary: {}", primary.share);
        }
        if let Some(backup) = &o.backup {
            println!("  Backup: {}", backup.share);
        }
        if let Some(note) = &o.note {
            println!("  Note: {}", note);
        }
    }
    if let Some(ip_source) = &record.ip_source {
        println!("IP source: {}", ip_source);
    }
    if let Some(expires_at) = &record.expires_at {
        println!("Expires: {}", expires_at.format("%Y-%m-%d"));
    }
    if let Some(remark) = &record.remark {
        println!("Remark: {}", remark);
    }
    println!("Created: {}", record.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated: {}", record.updated_at.format("%Y-%m-%d %H:%M:%S"));
}
