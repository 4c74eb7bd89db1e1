use stockroom_core::models::{Supply, SupplyPatch};

use crate::cli::SupplyCommands;
use crate::commands::common::{open_service, pending_note, resolve_id, Context, OpenMode};
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::error::CliError;

pub async fn run_supply(command: SupplyCommands, ctx: &Context) -> Result<(), CliError> {
    let service = open_service(ctx, OpenMode::Refresh).await?;
    let supplies = service.supplies();

    match command {
        SupplyCommands::Add { product, quantity } => {
            let product_id = resolve_id(&product, &service.products().items())?;
            let record = service
                .receive_supply(Supply {
                    product_id: product_id.clone(),
                    quantity,
                })
                .await?;
            println!("{}{}", record.id, pending_note(&record));

            if let Some(product) = service.products().find(&product_id).await? {
                println!(
                    "{} now has {} in stock",
                    product.fields.name, product.fields.quantity
                );
            }
            Ok(())
        }
        SupplyCommands::List { list } => run_list(supplies.items(), list),
        SupplyCommands::Edit { id, quantity } => {
            let patch = quantity.map(|quantity| SupplyPatch {
                quantity: Some(quantity),
            });
            run_edit(supplies, &id, patch).await
        }
        SupplyCommands::Delete { id } => run_delete(supplies, &id).await.map(drop),
    }
}
