//! OTP issuance, verification and delivery.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::CoreResult;
use crate::otp::{OtpCode, OtpPurpose, OtpRecord, OtpState};
use crate::ports::{Clock, OtpStore, SmsGateway};

/// Stores, verifies and sends one-time passwords.
#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    sms: Arc<dyn SmsGateway>,
    clock: Arc<dyn Clock>,
}

impl OtpService {
    pub fn new(store: Arc<dyn OtpStore>, sms: Arc<dyn SmsGateway>, clock: Arc<dyn Clock>) -> Self {
        OtpService { store, sms, clock }
    }

    /// Invalidates every unused code for `(phone, purpose)` and stores a
    /// fresh one valid for ten minutes.
    pub async fn store_otp(&self, phone: &str, purpose: OtpPurpose) -> CoreResult<OtpRecord> {
        let record = OtpRecord::issue(phone, purpose, self.clock.now());
        self.store.rotate(&record).await?;
        debug!(phone = %phone, purpose = %purpose, "OTP stored");
        Ok(record)
    }

    /// `true` exactly once per stored code: the newest unused matching
    /// record must be unexpired, and marking it used must win against any
    /// concurrent verification.
    pub async fn verify_otp(
        &self,
        phone: &str,
        code: &OtpCode,
        purpose: OtpPurpose,
    ) -> CoreResult<bool> {
        let Some(record) = self
            .store
            .find_latest_unused(phone, code.as_str(), purpose)
            .await?
        else {
            return Ok(false);
        };

        match record.state(self.clock.now()) {
            OtpState::Active => {}
            OtpState::Expired => {
                debug!(phone = %phone, purpose = %purpose, "OTP expired");
                return Ok(false);
            }
            OtpState::Used => return Ok(false),
        }

        let consumed = self.store.consume(&record.id).await?;
        if consumed {
            info!(phone = %phone, purpose = %purpose, "OTP verified");
        }
        Ok(consumed)
    }

    /// Sends the code by SMS. Delivery failures are logged, never returned.
    pub async fn send_otp(&self, record: &OtpRecord) {
        if let Err(e) = self.sms.send(&record.phone, &record.sms_message()).await {
            warn!(phone = %record.phone, error = %e, "OTP SMS delivery failed");
        }
    }

    /// [`store_otp`](Self::store_otp) followed by [`send_otp`](Self::send_otp).
    pub async fn issue(&self, phone: &str, purpose: OtpPurpose) -> CoreResult<OtpRecord> {
        let record = self.store_otp(phone, purpose).await?;
        self.send_otp(&record).await;
        Ok(record)
    }
}
