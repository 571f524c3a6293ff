pub mod error;

pub mod config;

pub mod controller {

    pub mod event_label;
    pub use event_label::EventLabel;

    pub mod route;
    pub use route::LabelPath;

    pub mod traits;
    pub use traits::{ActivityHandler, FnHandler, HandlerResult, handler_fn};

    pub mod next;
    pub use next::Next;

    pub mod handler_registry;
    pub use handler_registry::HandlerRegistry;

    pub mod activity_router;
    pub use activity_router::{ActivityRouter, TurnReport};

    pub mod shared_router;
    pub use shared_router::SharedRouter;

    pub mod metrics;
    pub use metrics::{DispatchMetrics, DispatchMetricsSnapshot};

    pub mod handlers;
}

pub mod model {
    pub mod activity;
    pub use activity::{
        Activity, ChannelAccount, ConversationAccount, TOKEN_RESPONSE_EVENT_NAME, activity_types,
    };

    pub mod turn_context;
    pub use turn_context::TurnContext;
}

pub mod logging;
pub use logging::LoggerBuilder;

pub mod replay;

pub use config::Config;

pub use error::{AppError, AppResult, DispatchError};

pub use controller::{
    ActivityHandler, ActivityRouter, EventLabel, HandlerRegistry, Next, SharedRouter, TurnReport,
};

pub use model::{Activity, TurnContext};
