//! Users command - Account bootstrap.

use crate::cli::args::{UsersAction, UsersArgs};
use crate::config::Config;
use crate::domain::RoleName;
use crate::errors::AppResult;
use crate::infra;
use crate::services::{NewAccount, ServiceContainer, Services};

/// Execute the users command
pub async fn execute(args: UsersArgs, config: Config) -> AppResult<()> {
    match args.action {
        UsersAction::CreateAdmin {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            let uow = infra::connect(&config).await?;
            let services = Services::from_unit_of_work(uow, config);

            let user = services
                .accounts()
                .create_user(NewAccount {
                    username,
                    email,
                    password,
                    first_name,
                    last_name,
                    role: Some(RoleName::Admin),
                })
                .await?;

            println!("Created admin '{}' ({})", user.username, user.id);
            Ok(())
        }
    }
}
