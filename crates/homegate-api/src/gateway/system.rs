// System-level endpoints: status page and restart.

use tracing::{debug, info};

use super::client::GatewayClient;
use super::{RESTART_PATH, STATUS_PATH};
use crate::error::Error;
use crate::extract;
use crate::models::StatusFields;

/// `resetInfo` payload the admin UI sends for a plain reboot.
const RESTART_PAYLOAD: &str = r#"["btn1","Device","Router"]"#;

impl GatewayClient {
    /// Read the network-setup page.
    ///
    /// `GET /network_setup.jst`. Missing fields come back as `Unknown`/0.
    pub async fn status(&self) -> Result<StatusFields, Error> {
        debug!("fetching gateway status");
        let body = self.fetch_protected(STATUS_PATH).await?;
        Ok(extract::extract_status(&body))
    }

    /// Reboot the gateway.
    ///
    /// `POST /actionHandler/ajaxSet_Reset_Restore.jst`. A non-success answer
    /// is reported as `Http` so callers can decide whether to retry.
    pub async fn restart(&self) -> Result<(), Error> {
        let page = self
            .post_form(RESTART_PATH, &[("resetInfo", RESTART_PAYLOAD)])
            .await?;
        if page.is_login_redirect() {
            return Err(Error::SessionExpired);
        }
        if !page.is_accepted() {
            return Err(Error::Http {
                status: page.status.as_u16(),
            });
        }
        info!("restart requested");
        Ok(())
    }
}
