//! Review CLI commands

use anyhow::Result;
use clap::{Parser, Subcommand};
use hearth_core::{Listing, Review};
use uuid::Uuid;

use super::{print_json, Catalog, OutputArgs, OutputFormat};

#[derive(Parser, Debug)]
pub struct ReviewArgs {
    #[command(subcommand)]
    pub command: ReviewCommands,
}

#[derive(Subcommand, Debug)]
pub enum ReviewCommands {
    /// List verified reviews, newest first
    List(ReviewListArgs),
    /// Show rating statistics over verified reviews
    Stats(OutputArgs),
    /// Mark a review verified (or pending with --pending)
    Verify(VerifyArgs),
    /// Delete a review
    Delete(ReviewDeleteArgs),
}

#[derive(Parser, Debug)]
pub struct ReviewListArgs {
    /// Max reviews to return (1-100)
    #[arg(long, short, default_value = "20")]
    pub limit: i64,

    /// Number of reviews to skip
    #[arg(long, default_value = "0")]
    pub offset: i64,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Review ID
    pub id: Uuid,

    /// Send the review back to moderation instead
    #[arg(long)]
    pub pending: bool,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct ReviewDeleteArgs {
    /// Review ID
    pub id: Uuid,
}

pub async fn run_review(catalog: &Catalog, args: ReviewArgs) -> Result<()> {
    match args.command {
        ReviewCommands::List(list) => {
            let listing = catalog
                .reviews
                .list_or_empty(Some(list.limit), Some(list.offset))
                .await?;
            print_reviews(&listing, list.out.format())
        }
        ReviewCommands::Stats(out) => {
            let stats = catalog.reviews.stats().await?;
            if out.format() == OutputFormat::Json {
                return print_json(&stats);
            }
            println!(
                "{} reviews, average {:.1}",
                stats.total_reviews, stats.average_rating
            );
            for (rating, count) in stats.rating_distribution.iter().rev() {
                println!("  {}★  {}", rating, count);
            }
            Ok(())
        }
        ReviewCommands::Verify(verify) => {
            let review = catalog
                .reviews
                .update_status(verify.id, !verify.pending)
                .await?;
            if verify.out.format() == OutputFormat::Json {
                return print_json(&review);
            }
            let state = if review.is_verified { "verified" } else { "pending" };
            println!("✓ review {} is now {}", review.id, state);
            Ok(())
        }
        ReviewCommands::Delete(delete) => {
            catalog.reviews.delete(delete.id).await?;
            println!("✓ deleted review {}", delete.id);
            Ok(())
        }
    }
}

fn print_reviews(listing: &Listing<Review>, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(listing);
    }

    if let Some(message) = &listing.message {
        eprintln!("⚠ {}", message);
    }
    if listing.items.is_empty() {
        println!("(no reviews)");
        return Ok(());
    }
    for review in &listing.items {
        let location = review.location.as_deref().unwrap_or("-");
        println!(
            "{}  {}★  {} ({})  {}",
            review.id, review.rating, review.reviewer_name, location, review.review_text
        );
    }
    Ok(())
}
