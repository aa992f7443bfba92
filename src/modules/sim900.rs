use super::ModuleParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sim900;

impl ModuleParams for Sim900 {
    fn max_post_data(&self) -> u32 {
        318_976
    }
}
