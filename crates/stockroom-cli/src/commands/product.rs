use stockroom_core::models::{Product, ProductPatch, RecordId};

use crate::cli::ProductCommands;
use crate::commands::add::run_add;
use crate::commands::common::{open_service, resolve_id, Context, OpenMode};
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::error::CliError;

pub async fn run_product(command: ProductCommands, ctx: &Context) -> Result<(), CliError> {
    let service = open_service(ctx, OpenMode::Refresh).await?;
    let products = service.products();

    match command {
        ProductCommands::Add {
            name,
            category,
            price,
            quantity,
            description,
        } => {
            let category_id = resolve_id(&category, &service.categories().items())?;
            let mut product = Product::new(name, category_id, price).with_quantity(quantity);
            product.description = description;
            run_add(products, product).await
        }
        ProductCommands::List { category, list } => {
            let mut items = products.items();
            if let Some(category) = category {
                let category_id = resolve_id(&category, &service.categories().items())?;
                items.retain(|product| product.fields.category_id == category_id);
            }
            run_list(items, list)
        }
        ProductCommands::Edit {
            id,
            name,
            category,
            price,
            quantity,
            description,
        } => {
            let category_id = category
                .map(|category| resolve_id(&category, &service.categories().items()))
                .transpose()?;
            let patch = product_patch(name, category_id, price, quantity, description);
            run_edit(products, &id, patch).await
        }
        ProductCommands::Delete { id } => run_delete(products, &id).await.map(drop),
    }
}

pub fn product_patch(
    name: Option<String>,
    category_id: Option<RecordId>,
    price: Option<f64>,
    quantity: Option<i64>,
    description: Option<String>,
) -> Option<ProductPatch> {
    let patch = ProductPatch {
        name,
        category_id,
        price,
        quantity,
        description,
    };
    let empty = patch.name.is_none()
        && patch.category_id.is_none()
        && patch.price.is_none()
        && patch.quantity.is_none()
        && patch.description.is_none();
    (!empty).then_some(patch)
}
