use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::clients::list_clients,
        api::clients::create_client,
        api::messages::list_messages,
        api::mailings::list_mailings,
        api::mailings::create_mailing,
    ),
    tags(
        (name = "mailings", description = "Newsletter mailings API")
    )
)]
pub struct ApiDoc;
