/// Generates the read methods every entity client exposes, named after the entity.
macro_rules! impl_client_methods {
    ($client_name:ident, $entity:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub async fn [<list_ $entity_name_snake s>](&self, top: usize) -> Result<Vec<$entity>, $crate::error::ODataError> {
                    tracing::debug!("Sending request");
                    self.inner
                        .list_top(<$entity as $crate::odata_framework::Entity>::ENTITY_SET, top)
                        .await
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<get_ $entity_name_snake>](&self, id: &str) -> Result<$entity, $crate::error::ODataError> {
                    tracing::debug!("Sending request");
                    self.inner
                        .get_by_key(<$entity as $crate::odata_framework::Entity>::ENTITY_SET, id)
                        .await
                }
            }
        }
    };
}

macro_rules! impl_client_new {
    ($client_name:ident, $entity:ty) => {
        impl $client_name {
            pub fn new(inner: $crate::odata_framework::ODataClient<$entity>) -> Self {
                Self { inner }
            }

            /// Request-scoped client over a shared connection pool, decorated
            /// with the gateway headers.
            pub fn configure(
                http: reqwest::Client,
                config: &$crate::config::GatewayConfig,
            ) -> Result<Self, $crate::error::ODataError> {
                let settings = $crate::clients::configure(
                    &config.base_url,
                    &config.credentials(),
                )?
                .with_timeout(config.timeout);
                Ok(Self::new($crate::odata_framework::ODataClient::new(http, settings)))
            }
        }
    };
}

macro_rules! impl_basic_client {
    ($client_name:ident, $entity:ty, $entity_name_snake:ident) => {
        impl_client_new!($client_name, $entity);
        impl_client_methods!($client_name, $entity, $entity_name_snake);
    };
}
