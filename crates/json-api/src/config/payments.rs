//! Payments Config

use std::time::Duration;

use clap::Args;

use lectern_app::{
    context::GatewaysConfig,
    domain::payments::{
        fawry::FawryConfig, paymob::PaymobConfig, paytabs::PaytabsConfig,
        return_link::DEFAULT_APP_SCHEME,
    },
};

/// Payment gateway settings. A provider is offered only when its credentials are set.
#[derive(Debug, Args)]
pub struct PaymentsConfig {
    /// Gateway new enrollments pay through
    #[arg(long, env = "PAYMENT_GATEWAY", default_value = "fawry")]
    pub payment_gateway: String,

    /// ISO currency code sent to providers
    #[arg(long, env = "PAYMENT_CURRENCY", default_value = "EGP")]
    pub payment_currency: String,

    /// Upper bound on a provider interaction, in seconds
    #[arg(long, env = "PAYMENT_TIMEOUT_SECONDS", default_value_t = 30)]
    pub payment_timeout_seconds: u64,

    /// How long coupon lookups are cached, in seconds
    #[arg(long, env = "COUPON_CACHE_TTL_SECONDS", default_value_t = 300)]
    pub coupon_cache_ttl_seconds: u64,

    /// Client-app URL scheme buyers are sent back to
    #[arg(long, env = "APP_SCHEME", default_value = DEFAULT_APP_SCHEME)]
    pub app_scheme: String,

    /// Public base URL providers return buyers and send callbacks to
    #[arg(long, env = "APP_URL", default_value = "http://localhost:8698")]
    pub app_url: String,

    #[arg(long, env = "FAWRY_BASE_URL", default_value = "https://atfawry.fawrystaging.com")]
    pub fawry_base_url: String,

    #[arg(long, env = "FAWRY_MERCHANT_CODE")]
    pub fawry_merchant_code: Option<String>,

    #[arg(long, env = "FAWRY_SECRET", hide_env_values = true)]
    pub fawry_secret: Option<String>,

    #[arg(long, env = "PAYMOB_BASE_URL", default_value = "https://accept.paymob.com")]
    pub paymob_base_url: String,

    #[arg(long, env = "PAYMOB_API_KEY", hide_env_values = true)]
    pub paymob_api_key: Option<String>,

    #[arg(long, env = "PAYMOB_INTEGRATION_ID")]
    pub paymob_integration_id: Option<u64>,

    #[arg(long, env = "PAYMOB_IFRAME_ID")]
    pub paymob_iframe_id: Option<u64>,

    /// Secret Paymob signs callbacks with
    #[arg(long, env = "PAYMOB_HMAC_SECRET", hide_env_values = true)]
    pub paymob_hmac_secret: Option<String>,

    #[arg(long, env = "PAYTABS_BASE_URL", default_value = "https://secure-egypt.paytabs.com")]
    pub paytabs_base_url: String,

    #[arg(long, env = "PAYTABS_PROFILE_ID")]
    pub paytabs_profile_id: Option<u64>,

    #[arg(long, env = "PAYTABS_SERVER_KEY", hide_env_values = true)]
    pub paytabs_server_key: Option<String>,
}

impl PaymentsConfig {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_seconds)
    }

    fn app_path(&self, path: &str) -> String {
        format!("{}{path}", self.app_url.trim_end_matches('/'))
    }

    /// Provider settings for every gateway with complete credentials.
    #[must_use]
    pub fn gateways_config(&self) -> GatewaysConfig {
        GatewaysConfig {
            default: self.payment_gateway.clone(),
            timeout: self.timeout(),
            fawry: self.fawry(),
            paymob: self.paymob(),
            paytabs: self.paytabs(),
        }
    }

    fn fawry(&self) -> Option<FawryConfig> {
        Some(FawryConfig {
            base_url: self.fawry_base_url.clone(),
            merchant_code: self.fawry_merchant_code.clone()?,
            secret: self.fawry_secret.clone()?,
            currency: self.payment_currency.clone(),
            return_url: self.app_path("/payments/fawry/return"),
            timeout: self.timeout(),
        })
    }

    fn paymob(&self) -> Option<PaymobConfig> {
        let base_url = self.paymob_base_url.trim_end_matches('/');
        let iframe_id = self.paymob_iframe_id?;

        Some(PaymobConfig {
            base_url: base_url.to_string(),
            api_key: self.paymob_api_key.clone()?,
            integration_id: self.paymob_integration_id?,
            iframe_url: format!("{base_url}/api/acceptance/iframes/{iframe_id}"),
            currency: self.payment_currency.clone(),
            hmac_secret: self.paymob_hmac_secret.clone(),
            timeout: self.timeout(),
        })
    }

    fn paytabs(&self) -> Option<PaytabsConfig> {
        Some(PaytabsConfig {
            base_url: self.paytabs_base_url.clone(),
            profile_id: self.paytabs_profile_id?,
            server_key: self.paytabs_server_key.clone()?,
            currency: self.payment_currency.clone(),
            return_url: self.app_path("/payments/paytabs/return"),
            callback_url: self.app_path("/payments/paytabs/callback"),
            timeout: self.timeout(),
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        payments: PaymentsConfig,
    }

    #[test]
    fn incomplete_credentials_leave_gateway_unconfigured() -> TestResult {
        let harness = Harness::try_parse_from([
            "lectern-json",
            "--paymob-api-key",
            "key",
            "--paymob-integration-id",
            "12",
        ])?;

        assert!(harness.payments.gateways_config().paymob.is_none(), "iframe id is missing");

        Ok(())
    }

    #[test]
    fn provider_urls_point_back_at_the_app() -> TestResult {
        let harness = Harness::try_parse_from([
            "lectern-json",
            "--app-url",
            "https://acme.lectern.app/",
            "--paytabs-profile-id",
            "42",
            "--paytabs-server-key",
            "server-key",
            "--paymob-api-key",
            "key",
            "--paymob-integration-id",
            "12",
            "--paymob-iframe-id",
            "77",
        ])?;

        let gateways = harness.payments.gateways_config();

        let paytabs = gateways.paytabs.ok_or("paytabs should be configured")?;
        let paymob = gateways.paymob.ok_or("paymob should be configured")?;

        assert_eq!(paytabs.return_url, "https://acme.lectern.app/payments/paytabs/return");
        assert_eq!(paytabs.callback_url, "https://acme.lectern.app/payments/paytabs/callback");
        assert_eq!(paymob.iframe_url, "https://accept.paymob.com/api/acceptance/iframes/77");
        assert!(paymob.hmac_secret.is_none(), "hmac secret was not given");

        Ok(())
    }
}
