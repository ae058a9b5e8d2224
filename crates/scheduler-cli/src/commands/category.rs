use anyhow::Result;
use owo_colors::OwoColorize;
use scheduler_core::models::{NewCategoryData, UpdateCategoryData};
use scheduler_core::repository::Repository;

use crate::cli::{CategoryAddCommand, CategoryDeleteCommand, CategoryEditCommand};
use crate::views::table;

pub async fn list(repo: &dyn Repository) -> Result<()> {
    let categories = repo.list_categories().await?;
    table::display_categories(&categories);
    Ok(())
}

pub async fn add(repo: &dyn Repository, command: CategoryAddCommand) -> Result<()> {
    let category = repo
        .create_category(NewCategoryData {
            name: command.name,
            bg_color: command.bg,
            fg_color: command.fg,
            sort_order: command.sort_order,
        })
        .await?;
    println!("{} Created category #{}: {}", "+".green().bold(), category.id, category.name);
    Ok(())
}

pub async fn edit(repo: &dyn Repository, command: CategoryEditCommand) -> Result<()> {
    let category = repo
        .update_category(
            command.id,
            UpdateCategoryData {
                bg_color: command.bg,
                fg_color: command.fg,
                sort_order: command.sort_order,
            },
        )
        .await?;
    println!("{} Updated category #{}", "~".cyan().bold(), category.id);
    Ok(())
}

pub async fn delete(repo: &dyn Repository, command: CategoryDeleteCommand) -> Result<()> {
    repo.delete_category(command.id).await?;
    println!("{} Deleted category #{}", "-".red().bold(), command.id);
    Ok(())
}
