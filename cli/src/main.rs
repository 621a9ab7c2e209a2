//! idledger CLI - Command Line Interface

use clap::{Parser, Subcommand};
use idledger_cli::{ApiClient, OrgArgs};

#[derive(Parser)]
#[command(name = "idledger")]
#[command(about = "idledger - organization registry and identifier hash client")]
#[command(version)]
struct Cli {
    /// Node URL
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an organization
    RegisterOrg {
        item_num: String,
        org_name: String,
        identity_prefix: String,
        public_key: String,
        authority: String,
    },

    /// Look up organizations by name (case-insensitive)
    QueryOrg {
        org_name: String,
    },

    /// Record the mapping-data hash of an identifier
    PutHash {
        identifier: String,
        hash: String,
    },

    /// Print the mapping-data hash recorded for an identifier
    QueryHash {
        identifier: String,
    },

    /// Node status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let api_client = ApiClient::new(&cli.node)?;

    match cli.command {
        Commands::RegisterOrg {
            item_num,
            org_name,
            identity_prefix,
            public_key,
            authority,
        } => {
            let org = OrgArgs {
                item_num: item_num.clone(),
                org_name,
                identity_prefix,
                public_key,
                authority,
            };
            match api_client.register_org(org).await {
                Ok(()) => println!("Organization {} registered", item_num),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::QueryOrg { org_name } => match api_client.query_org(&org_name).await {
            Ok(rows) => println!("{}", serde_json::to_string_pretty(&rows)?),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },

        Commands::PutHash { identifier, hash } => {
            match api_client.put_hash(&identifier, &hash).await {
                Ok(()) => println!("Hash recorded for {}", identifier),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::QueryHash { identifier } => match api_client.query_hash(&identifier).await {
            Ok(Some(hash)) => println!("{}", hash),
            Ok(None) => println!("identifier not registered"),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Status => match api_client.status().await {
            Ok(status) => {
                println!("idledger Node Status");
                println!("====================");
                println!("Name:          {}", status.name);
                println!("Backend:       {}", status.backend);
                println!("State Version: {}", status.state_version);
                println!("Contracts:     {}", status.contracts.join(", "));
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
