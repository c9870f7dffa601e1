//! Application server: builds the stateful components (preferences, quiet
//! hours, device tokens, channel adapters, `DispatchService`) from
//! `Settings` and registers the RPC surface (§6).

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{dev, web, App, HttpServer};
use cadence::StatsdClient;
use notification_common::db::memory::{
    MemoryDeviceTokenRepository, MemoryNotificationRepository, MemoryPreferenceRepository,
    MemoryQuietHoursRepository,
};
use notification_common::db::{
    DeviceTokenRepository, NotificationRepository, PreferenceRepository, QuietHoursRepository,
};
use notification_common::device_tokens::DeviceTokenRegistry;
use notification_common::enums::Channel;
use notification_common::middleware::SentryWrapper;
use notification_common::preferences::PreferenceStore;

use crate::audit_client::HttpAuditSink;
use crate::channels::email::client::EmailClient;
use crate::channels::email::EmailAdapter;
use crate::channels::in_app::InAppAdapter;
use crate::channels::push::http::FcmHttpProvider;
use crate::channels::push::PushAdapter;
use crate::channels::sms::SmsAdapter;
use crate::channels::AdapterRegistry;
use crate::dispatch_service::DispatchService;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::router::ChannelRouter;
use crate::routes::device_tokens::{get_device_tokens, register_device_token, unregister_device_token};
use crate::routes::health::{health_route, lb_heartbeat_route, status_route, version_route};
use crate::routes::notifications::{
    get_notification_status, get_notifications, mark_as_read, send_bulk_notification, send_notification,
};
use crate::routes::preferences::{get_preferences, update_preferences};
use crate::routes::quiet_hours::{get_quiet_hours, update_quiet_hours};
use crate::settings::Settings;

#[derive(Clone)]
pub struct ServerState {
    pub metrics: Box<StatsdClient>,
    pub settings: Settings,
    pub http: reqwest::Client,
    pub dispatch: Arc<DispatchService>,
    pub preferences: Arc<PreferenceStore>,
    pub quiet_hours: Arc<dyn QuietHoursRepository>,
    pub device_tokens: Arc<DeviceTokenRegistry>,
}

pub struct Server;

impl Server {
    pub async fn with_settings(settings: Settings) -> ApiResult<dev::Server> {
        let metrics = Box::new(metrics::metrics_from_opts(&settings)?);
        let bind_address = settings.bind_address();
        let http = reqwest::Client::new();

        let (preferences_repo, quiet_hours_repo, device_tokens_repo, notifications_repo) =
            Self::build_repositories(&settings)?;

        let preferences = Arc::new(PreferenceStore::new(preferences_repo));
        let device_tokens = Arc::new(DeviceTokenRegistry::new(device_tokens_repo));
        let in_app = Arc::new(InAppAdapter::new(notifications_repo));

        let push_provider = Arc::new(FcmHttpProvider::new(
            url::Url::parse("https://fcm.googleapis.com/").expect("static FCM base URL"),
            &settings.push.credentials,
            http.clone(),
        ));
        let push = Arc::new(PushAdapter::new(device_tokens.clone(), push_provider));
        let sms = Arc::new(SmsAdapter::new(settings.sms.clone()));
        let email = Arc::new(EmailAdapter::new(
            settings.email.clone(),
            EmailClient::new(http.clone()),
            settings.source_service.clone(),
        ));

        let adapters = AdapterRegistry::new()
            .with(Channel::InApp, in_app.clone())
            .with(Channel::Push, push)
            .with(Channel::Sms, sms)
            .with(Channel::Email, email);

        let router = Arc::new(ChannelRouter::new(preferences.clone(), quiet_hours_repo.clone(), adapters));
        let audit = Arc::new(HttpAuditSink::new(settings.audit.service_url.clone(), http.clone()));
        let dispatch = Arc::new(DispatchService::new(router, in_app, audit));

        let state = ServerState {
            metrics,
            settings,
            http,
            dispatch,
            preferences,
            quiet_hours: quiet_hours_repo,
            device_tokens,
        };

        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(Cors::permissive())
                .wrap(SentryWrapper::<ApiError>::new(
                    Arc::new((*state.metrics).clone()),
                    "api_error".to_string(),
                ))
                .service(web::resource("/v1/notifications").route(web::post().to(send_notification)))
                .service(web::resource("/v1/notifications/bulk").route(web::post().to(send_bulk_notification)))
                .service(web::resource("/v1/notifications/list").route(web::get().to(get_notifications)))
                .service(web::resource("/v1/notifications/mark-read").route(web::post().to(mark_as_read)))
                .service(
                    web::resource("/v1/notifications/{notification_id}/status")
                        .route(web::get().to(get_notification_status)),
                )
                .service(
                    web::resource("/v1/preferences")
                        .route(web::get().to(get_preferences))
                        .route(web::put().to(update_preferences)),
                )
                .service(web::resource("/v1/device-tokens").route(web::get().to(get_device_tokens)))
                .service(web::resource("/v1/device-tokens/register").route(web::post().to(register_device_token)))
                .service(
                    web::resource("/v1/device-tokens/unregister").route(web::post().to(unregister_device_token)),
                )
                .service(
                    web::resource("/v1/quiet-hours")
                        .route(web::get().to(get_quiet_hours))
                        .route(web::put().to(update_quiet_hours)),
                )
                // Dockerflow
                .service(web::resource("/status").route(web::get().to(status_route)))
                .service(web::resource("/health").route(web::get().to(health_route)))
                .service(web::resource("/__heartbeat__").route(web::get().to(status_route)))
                .service(web::resource("/__lbheartbeat__").route(web::get().to(lb_heartbeat_route)))
                .service(web::resource("/__version__").route(web::get().to(version_route)))
        })
        .bind(bind_address)?
        .run();

        Ok(server)
    }

    #[allow(clippy::type_complexity)]
    fn build_repositories(
        settings: &Settings,
    ) -> ApiResult<(
        Arc<dyn PreferenceRepository>,
        Arc<dyn QuietHoursRepository>,
        Arc<dyn DeviceTokenRepository>,
        Arc<dyn NotificationRepository>,
    )> {
        match settings.db_dsn.as_deref() {
            Some(dsn) if !dsn.is_empty() => {
                let store = Arc::new(
                    notification_common::db::postgres::PostgresStore::new(dsn, &settings.db_settings)
                        .map_err(notification_common::errors::ApiError::from)?,
                );
                Ok((store.clone(), store.clone(), store.clone(), store))
            }
            _ => Ok((
                Arc::new(MemoryPreferenceRepository::default()),
                Arc::new(MemoryQuietHoursRepository::default()),
                Arc::new(MemoryDeviceTokenRepository::default()),
                Arc::new(MemoryNotificationRepository::default()),
            )),
        }
    }
}
