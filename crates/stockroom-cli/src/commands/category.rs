use stockroom_core::models::{Category, CategoryPatch};

use crate::cli::CategoryCommands;
use crate::commands::add::run_add;
use crate::commands::common::{join_name, open_service, resolve_record, Context, OpenMode};
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::error::CliError;

pub async fn run_category(command: CategoryCommands, ctx: &Context) -> Result<(), CliError> {
    let service = open_service(ctx, OpenMode::Refresh).await?;
    let categories = service.categories();

    match command {
        CategoryCommands::Add { name } => run_add(categories, Category::new(join_name(&name))).await,
        CategoryCommands::List { list } => run_list(categories.items(), list),
        CategoryCommands::Edit { id, name } => {
            run_edit(categories, &id, category_patch(name)).await
        }
        CategoryCommands::Delete { id, force } => {
            let items = categories.items();
            let category = resolve_record(&id, &items)?;
            if !force && service.category_has_products(&category.id).await? {
                return Err(CliError::CategoryInUse(category.fields.name.clone()));
            }
            run_delete(categories, category.id.as_str()).await.map(drop)
        }
    }
}

pub fn category_patch(name: Option<String>) -> Option<CategoryPatch> {
    name.map(|name| CategoryPatch { name: Some(name) })
}
