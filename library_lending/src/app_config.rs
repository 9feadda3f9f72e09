use paperclip::actix::web;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/loans")
                        .service(
                            web::resource("").route(web::get().to(handlers::get_active_loans)),
                        )
                        .service(
                            web::resource("/return").route(web::post().to(handlers::return_book)),
                        ),
                )
                .service(
                    web::scope("/borrower/{borrower_id}")
                        .service(web::resource("/fines").route(web::get().to(handlers::get_fines)))
                        .service(
                            web::resource("/reservations")
                                .route(web::get().to(handlers::get_reservations_by_borrower)),
                        ),
                )
                .service(
                    web::scope("/reservations")
                        .service(
                            web::resource("").route(web::post().to(handlers::create_reservation)),
                        )
                        .service(
                            web::resource("/{reservation_id}")
                                .route(web::delete().to(handlers::cancel_reservation)),
                        ),
                )
                .service(
                    web::scope("/book/{book_id}")
                        .service(
                            web::resource("/reservations")
                                .route(web::get().to(handlers::get_reservations_by_book)),
                        )
                        .service(
                            web::resource("/availability")
                                .route(web::get().to(handlers::get_book_availability)),
                        ),
                ),
        );
}
