use super::ModuleParams;
use embassy_time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sim800;

impl ModuleParams for Sim800 {
    fn max_post_data(&self) -> u32 {
        319_488
    }
    fn power_key_pulse_time(&self) -> Duration {
        Duration::from_millis(1200)
    }
    fn power_key_settle_time(&self) -> Duration {
        Duration::from_millis(2000)
    }
    fn boot_announcement(&self) -> &'static str {
        "SMS Ready"
    }
}
