use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Checkout API",
        version = "0.1.0",
        description = r#"
# E-commerce Checkout API

A storefront backend covering the purchase funnel end to end: catalog
browsing, a per-user cart, coupon codes, billing-address capture, card
charges through an external gateway, and refund intake.

## Authentication

Cart, checkout and payment endpoints require a JWT bearer token:

```
Authorization: Bearer <your-jwt-token>
```

Catalog browsing and refund intake are public.

## Workflow

1. Browse `/api/v1/items` and add items to the cart.
2. Optionally apply a coupon via `POST /api/v1/cart/coupon`.
3. Submit the billing address with `POST /api/v1/checkout`; the response
   names the payment route to call.
4. Charge via `POST /api/v1/checkout/payment/{provider}` with a client-side
   payment token. The receipt carries the order's reference code.
5. Refunds are requested against that reference code at
   `POST /api/v1/refunds`.

## Error Handling

Errors use a consistent JSON body with appropriate HTTP status codes:

```json
{
  "error": "Not Found",
  "message": "This coupon does not exist",
  "request_id": "9f4b...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Catalog", description = "Public product catalog"),
        (name = "Cart", description = "Per-user cart and coupon endpoints"),
        (name = "Checkout", description = "Billing address capture and payment"),
        (name = "Refunds", description = "Refund request intake")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Catalog
        crate::handlers::catalog::list_items,
        crate::handlers::catalog::get_item,

        // Cart
        crate::handlers::cart::get_cart,
        crate::handlers::cart::add_cart_item,
        crate::handlers::cart::remove_cart_item,
        crate::handlers::cart::decrement_cart_item,
        crate::handlers::coupons::apply_coupon,

        // Checkout
        crate::handlers::checkout::submit_checkout,
        crate::handlers::payments::charge,

        // Refunds
        crate::handlers::refunds::request_refund,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,

            // Catalog types
            crate::handlers::catalog::ItemResponse,

            // Cart types
            crate::services::cart::CartSummary,
            crate::services::cart::CartLine,
            crate::services::cart::AppliedCoupon,
            crate::handlers::coupons::ApplyCouponRequest,

            // Checkout types
            crate::services::checkout::CheckoutInput,
            crate::services::checkout::CheckoutReceipt,
            crate::handlers::payments::ChargeRequest,
            crate::services::payments::PaymentReceipt,

            // Refund types
            crate::services::refunds::RefundInput,
            crate::services::refunds::RefundReceipt,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).expect("document should serialize");
        assert!(json.contains("Checkout API"));
        assert!(json.contains("/api/v1/items"));
        assert!(json.contains("/api/v1/checkout/payment/{provider}"));
        assert!(json.contains("bearer_auth"));
    }
}
