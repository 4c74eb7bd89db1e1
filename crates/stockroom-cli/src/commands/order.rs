use stockroom_core::models::{Order, OrderPatch};

use crate::cli::OrderCommands;
use crate::commands::add::run_add;
use crate::commands::common::{build_order_lines, open_service, resolve_id, Context, OpenMode};
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::error::CliError;

pub async fn run_order(command: OrderCommands, ctx: &Context) -> Result<(), CliError> {
    let service = open_service(ctx, OpenMode::Refresh).await?;
    let orders = service.orders();

    match command {
        OrderCommands::Add { customer, lines } => {
            let order = Order {
                customer_id: resolve_id(&customer, &service.customers().items())?,
                products: build_order_lines(&lines, &service.products().items())?,
            };
            run_add(orders, order).await
        }
        OrderCommands::List { list } => run_list(orders.items(), list),
        OrderCommands::Edit {
            id,
            customer,
            lines,
        } => {
            let customer_id = customer
                .map(|customer| resolve_id(&customer, &service.customers().items()))
                .transpose()?;
            let products = if lines.is_empty() {
                None
            } else {
                Some(build_order_lines(&lines, &service.products().items())?)
            };
            let patch = (customer_id.is_some() || products.is_some()).then_some(OrderPatch {
                customer_id,
                products,
            });
            run_edit(orders, &id, patch).await
        }
        OrderCommands::Delete { id } => run_delete(orders, &id).await.map(drop),
    }
}
