use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::LevelFilter;
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    request::{FromRequest, Outcome},
    Data, Orbit, Request, Response, Rocket,
};

/// Sequence number of a request, used to tie together its log lines.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RequestId {
    /// Take the next number. Wraps on overflow.
    pub fn next() -> RequestId {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for &'r RequestId {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(req.local_cache(RequestId::next))
    }
}

/// Logs every request and response, tagged with the [`RequestId`].
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let protocol = if rocket.config().tls_enabled() {
            "https"
        } else {
            "http"
        };
        let address = &rocket.config().address;
        let port = &rocket.config().port;
        info!("Scoring service listening on {protocol}://{address}:{port}");

        // Our own request lines replace Rocket's from here on.
        log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let id = req.local_cache(RequestId::next);
        info!("->req{id} {} {}", req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let id = req.local_cache(RequestId::next);
        let status = res.status();
        let route = req
            .route()
            .map(|route| match route.name {
                Some(ref name) => format!("{name} ({})", route.uri),
                None => route.uri.to_string(),
            })
            .unwrap_or_else(|| "UNKNOWN ROUTE".to_string());

        match status.class() {
            StatusClass::ServerError => error!("<-rsp{id} {status} {route}"),
            StatusClass::ClientError => warn!("<-rsp{id} {status} {route}"),
            _ => info!("<-rsp{id} {status} {route}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, draining requests...");
    }
}
