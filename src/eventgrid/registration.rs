//! Subscription registration.

use std::time::Duration;

use crate::config::GridSettings;
use crate::eventgrid::client::EventGridApi;
use crate::eventgrid::types::{
    EventDeliverySchema, EventGridResult, EventSubscription, EventSubscriptionDestination,
    EventSubscriptionProperties, UnknownDeliverySchema, WebHookDestinationProperties,
};
use crate::observability::metrics;

/// Build the webhook subscription described by the configuration.
pub fn build_subscription(grid: &GridSettings) -> Result<EventSubscription, UnknownDeliverySchema> {
    let schema: EventDeliverySchema = grid.event_schema.parse()?;

    Ok(EventSubscription {
        id: None,
        name: grid.subscription_name.clone(),
        kind: None,
        properties: EventSubscriptionProperties {
            topic: grid.topic_name.clone(),
            event_delivery_schema: schema,
            destination: EventSubscriptionDestination::WebHook(WebHookDestinationProperties {
                endpoint_url: Some(grid.subscription_url.clone()),
                endpoint_base_url: None,
            }),
        },
    })
}

/// Create or update `subscription` on its topic. A single attempt; failures are not retried.
pub async fn register_subscription(
    api: &dyn EventGridApi,
    subscription: &EventSubscription,
    timeout: Duration,
) -> EventGridResult<EventSubscription> {
    let topic_name = &subscription.properties.topic;

    let created = api
        .put_subscription(topic_name, &subscription.name, subscription, timeout)
        .await?;

    let serialized = serde_json::to_string(subscription)?;
    metrics::record_subscription_registered(topic_name);
    tracing::info!(
        topic = %topic_name,
        subscription = %serialized,
        "Successfully created subscription {} for topic {}",
        serialized,
        topic_name
    );
    Ok(created)
}
