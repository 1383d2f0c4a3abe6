//! Property CLI commands
//!
//! ```bash
//! hearth property list --city austin --min-price 200000 --json | jq '.items[].title'
//! hearth property show 5b0c...
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hearth_core::{Listing, PropertyAggregate, PropertyFilterParams, PropertyFilters};
use uuid::Uuid;

use super::{print_json, Catalog, OutputArgs, OutputFormat};

#[derive(Parser, Debug)]
pub struct PropertyArgs {
    #[command(subcommand)]
    pub command: PropertyCommands,
}

#[derive(Subcommand, Debug)]
pub enum PropertyCommands {
    /// List properties, newest first
    List(ListArgs),
    /// Show one property with features, amenities, photos and reviews
    Show(ShowArgs),
    /// Delete a property and every row referencing it
    Delete(DeleteArgs),
    /// List properties owned by an email address (case-insensitive)
    Owner(OwnerArgs),
    /// List published properties
    Published(OutputArgs),
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Exact property type (e.g. House, Condo)
    #[arg(long = "type")]
    pub property_type: Option<String>,

    /// Exact workflow status (e.g. Published)
    #[arg(long)]
    pub status: Option<String>,

    /// Minimum price
    #[arg(long)]
    pub min_price: Option<String>,

    /// Maximum price
    #[arg(long)]
    pub max_price: Option<String>,

    /// Minimum bedrooms
    #[arg(long)]
    pub bedrooms: Option<String>,

    /// Minimum bathrooms
    #[arg(long)]
    pub bathrooms: Option<String>,

    /// Case-insensitive substring of the city
    #[arg(long)]
    pub city: Option<String>,

    #[command(flatten)]
    pub out: OutputArgs,
}

impl ListArgs {
    fn params(&self) -> PropertyFilterParams {
        PropertyFilterParams {
            property_type: self.property_type.clone(),
            status: self.status.clone(),
            min_price: self.min_price.clone(),
            max_price: self.max_price.clone(),
            bedrooms: self.bedrooms.clone(),
            bathrooms: self.bathrooms.clone(),
            city: self.city.clone(),
        }
    }
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Property ID
    pub id: Uuid,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct DeleteArgs {
    /// Property ID
    pub id: Uuid,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct OwnerArgs {
    /// Owner email address
    pub email: String,

    #[command(flatten)]
    pub out: OutputArgs,
}

pub async fn run_property(catalog: &Catalog, args: PropertyArgs) -> Result<()> {
    match args.command {
        PropertyCommands::List(list) => {
            let filters = PropertyFilters::try_from(list.params()).context("Invalid filter")?;
            let listing = catalog.properties.list_or_empty(&filters).await?;
            print_listing(&listing, list.out.format())
        }
        PropertyCommands::Show(show) => {
            let property = catalog.properties.get_by_id(show.id).await?;
            match show.out.format() {
                OutputFormat::Json => print_json(&property),
                OutputFormat::Human => {
                    print_detail(&property);
                    Ok(())
                }
            }
        }
        PropertyCommands::Delete(delete) => {
            let summary = catalog.properties.delete(delete.id).await?;
            match delete.out.format() {
                OutputFormat::Json => print_json(&summary),
                OutputFormat::Human => {
                    println!(
                        "✓ deleted {} ({} features, {} amenities, {} photos, {} inquiries, {} reviews)",
                        delete.id,
                        summary.features,
                        summary.amenities,
                        summary.photos,
                        summary.inquiries,
                        summary.reviews
                    );
                    Ok(())
                }
            }
        }
        PropertyCommands::Owner(owner) => {
            let items = catalog.properties.get_by_owner_email(&owner.email).await?;
            print_listing(&Listing::new(items), owner.out.format())
        }
        PropertyCommands::Published(out) => {
            let items = catalog.properties.get_published().await?;
            print_listing(&Listing::new(items), out.format())
        }
    }
}

fn print_listing(listing: &Listing<PropertyAggregate>, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(listing);
    }

    if let Some(message) = &listing.message {
        eprintln!("⚠ {}", message);
    }
    if listing.items.is_empty() {
        println!("(no properties)");
        return Ok(());
    }
    for aggregate in &listing.items {
        println!("{}", summary_line(aggregate));
    }
    println!("{} properties", listing.count);
    Ok(())
}

fn summary_line(aggregate: &PropertyAggregate) -> String {
    let p = &aggregate.property;
    let price = p
        .price
        .map(|price| format!("${:.0}", price))
        .unwrap_or_else(|| "-".to_owned());
    format!(
        "{}  {} - {}, {}  {}  [{}]",
        p.id, p.title, p.city, p.state, price, p.status
    )
}

fn print_detail(aggregate: &PropertyAggregate) {
    let p = &aggregate.property;
    println!("┌─ {}", p.title);
    println!("│  {}, {}, {}", p.address, p.city, p.state);
    println!("│  {} · {} · {}", p.listing_type, p.property_type.as_deref().unwrap_or("-"), p.status);
    if let Some(price) = p.price {
        println!("│  ${:.0}", price);
    }
    if !aggregate.features.is_empty() {
        println!("│  features: {}", aggregate.features.join(", "));
    }
    if !aggregate.amenities.is_empty() {
        println!("│  amenities: {}", aggregate.amenities.join(", "));
    }
    for photo in &aggregate.photos {
        let marker = if photo.is_primary { "*" } else { " " };
        println!("│  {} photo {}: {}", marker, photo.display_order, photo.photo_url);
    }
    println!("└─ {} reviews", aggregate.reviews.len());
}
