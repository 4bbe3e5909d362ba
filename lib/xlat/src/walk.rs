//! Multi-hop translation through the maps of a [`System`].

use memory::address::{AddressSpace, FullAddress};

use crate::{
    context::Context,
    error::{Error, Slot},
    method::Method,
    step::Step,
    system::{SysMap, System},
};

/// The maximum number of methods applied by a single translation.
pub const MAX_HOPS: usize = 8;

/// Translates `addr` into the `goal` address space.
///
/// `nest` is the nesting depth of the read that requested this translation, or `0`.
pub(crate) fn translate(
    sys: &System,
    ctx: &Context<'_>,
    addr: FullAddress,
    goal: AddressSpace,
    nest: usize,
) -> Result<FullAddress, Error> {
    let mut current = addr;

    for hop in 0..MAX_HOPS {
        if current.space() == goal || current.is_none() {
            return Ok(current);
        }

        let from = current.space();
        let role = SysMap::route(from, goal).ok_or(Error::Unconfigured {
            slot: Slot::Route { from, to: goal },
        })?;
        let map = sys
            .map(role)
            .filter(|map| !map.is_empty())
            .ok_or(Error::Unconfigured {
                slot: Slot::Map(role),
            })?;
        let meth_role = map.lookup(current.value()).ok_or(Error::NoMatch {
            map: role,
            addr: current.value(),
        })?;

        let meth = sys.method(meth_role);
        if matches!(meth, Method::NoMeth) {
            return Err(Error::Unconfigured {
                slot: Slot::Method(Some(meth_role)),
            });
        }

        let mut step = Step::new(ctx, Some(sys), meth).with_nesting(nest);
        step.launch(current)?;
        let next = step.walk()?;

        log::trace!("hop {hop}: {current} -> {next} via MAP_{role}/METH_{meth_role}");
        current = next;
    }

    if current.space() == goal || current.is_none() {
        Ok(current)
    } else {
        Err(Error::CycleDetected {
            start: addr,
            limit: MAX_HOPS,
        })
    }
}
