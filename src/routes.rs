use crate::{api::payroll, config::Config};
use actix_governor::{Governor, GovernorConfigBuilder, PeerIpKeyExtractor};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build a per-route limiter config
    fn limiter_config(
        requests_per_min: u32,
    ) -> actix_governor::GovernorConfig<
        PeerIpKeyExtractor,
        actix_governor::governor::middleware::NoOpMiddleware<
            actix_governor::governor::clock::QuantaInstant,
        >,
    > {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap()
    }

    // Mutating pipeline endpoints get a tighter budget than reads.
    let trigger = limiter_config(config.rate_trigger_per_min);
    let read = limiter_config(config.rate_read_per_min);

    cfg.service(
        web::scope(&config.api_prefix).service(
            web::scope("/payroll")
                .service(
                    web::resource("/runs")
                        .route(
                            web::post()
                                .to(payroll::trigger_run)
                                .wrap(Governor::new(&trigger)),
                        )
                        .route(web::get().to(payroll::list_runs).wrap(Governor::new(&read))),
                )
                .service(
                    web::resource("/runs/{run_id}")
                        .wrap(Governor::new(&read))
                        .route(web::get().to(payroll::get_run)),
                )
                .service(
                    web::resource("/runs/{run_id}/process")
                        .wrap(Governor::new(&trigger))
                        .route(web::post().to(payroll::process_run)),
                )
                .service(
                    web::resource("/runs/{run_id}/payslips")
                        .route(
                            web::post()
                                .to(payroll::generate_payslips)
                                .wrap(Governor::new(&trigger)),
                        )
                        .route(
                            web::get()
                                .to(payroll::list_payslips)
                                .wrap(Governor::new(&read)),
                        ),
                )
                .service(
                    web::resource("/payslips/{payslip_id}/document")
                        .wrap(Governor::new(&read))
                        .route(web::get().to(payroll::download_document)),
                ),
        ),
    );
}

// TRIGGER
//  └─ POST /payroll/runs                  (create + calculate)
//       └─ POST /payroll/runs/{id}/process  (re-run a failed run)

// GENERATE
//  └─ POST /payroll/runs/{id}/payslips    (render, optionally notify)
//       └─ poll GET /payroll/runs/{id} and /runs/{id}/payslips
