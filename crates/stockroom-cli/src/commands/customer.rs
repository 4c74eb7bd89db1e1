use stockroom_core::models::{Customer, CustomerPatch};

use crate::cli::CustomerCommands;
use crate::commands::add::run_add;
use crate::commands::common::{join_name, open_service, Context, OpenMode};
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::error::CliError;

pub async fn run_customer(command: CustomerCommands, ctx: &Context) -> Result<(), CliError> {
    let service = open_service(ctx, OpenMode::Refresh).await?;
    let customers = service.customers();

    match command {
        CustomerCommands::Add {
            name,
            phone,
            address,
        } => {
            let customer = Customer {
                phone,
                address,
                ..Customer::new(join_name(&name))
            };
            run_add(customers, customer).await
        }
        CustomerCommands::List { list } => run_list(customers.items(), list),
        CustomerCommands::Edit {
            id,
            name,
            phone,
            address,
        } => run_edit(customers, &id, customer_patch(name, phone, address)).await,
        CustomerCommands::Delete { id } => run_delete(customers, &id).await.map(drop),
    }
}

pub fn customer_patch(
    name: Option<String>,
    phone: Option<String>,
    address: Option<String>,
) -> Option<CustomerPatch> {
    if name.is_none() && phone.is_none() && address.is_none() {
        return None;
    }
    Some(CustomerPatch {
        name,
        phone,
        address,
    })
}
