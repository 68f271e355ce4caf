use crate::ir::IrBuilder;
use crate::registry::SynthConfig;

/// Entry point for synthesis.
///
/// Borrows a backend and the configuration for the whole pass. The
/// operations live next to the code they produce: see [`crate::filter`],
/// [`crate::input`] and [`crate::execution`].
pub struct Synthesizer<'a, B: IrBuilder> {
    pub(crate) b: &'a B,
    pub(crate) config: &'a SynthConfig,
}

impl<'a, B: IrBuilder> Synthesizer<'a, B> {
    pub fn new(builder: &'a B, config: &'a SynthConfig) -> Self {
        Self { b: builder, config }
    }

    pub fn builder(&self) -> &'a B {
        self.b
    }

    pub fn config(&self) -> &'a SynthConfig {
        self.config
    }

    /// `carrier.member`, where `carrier` may itself be dotted.
    pub(crate) fn carrier_field(&self, carrier: &str, member: &str) -> B::Expr {
        self.b.selector(self.b.path(carrier), member)
    }
}
