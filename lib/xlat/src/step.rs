//! Resumable execution of a single [`Method`].
//!
//! A [`Step`] is launched on an input address and then advanced one page-table level at a time,
//! which lets tools inspect every entry of a walk. [`Method::apply`] simply runs a [`Step`] to
//! completion.

use memory::address::FullAddress;

use crate::{
    context::Context,
    error::{Error, Slot},
    method::{FIELDS_MAX, MemArrParams, Method, PgtParams, PteFormat},
    pgt::{self, Decoded},
    system::System,
};

/// The state of a method execution.
#[derive(Debug)]
pub struct Step<'a> {
    /// The callbacks used for memory and register access.
    ctx: &'a Context<'a>,
    /// The system used to translate reads of non-readable address spaces.
    sys: Option<&'a System>,
    /// The method being executed.
    meth: &'a Method,
    /// The address the step was launched on.
    input: FullAddress,
    /// The current table base, or the result once `remain` is zero.
    base: FullAddress,
    /// Address field values, least significant first; `idx[0]` is the in-page offset.
    idx: [u64; FIELDS_MAX],
    /// Field widths, least significant first.
    fields: [u8; FIELDS_MAX],
    /// Number of fields in use.
    nfields: usize,
    /// Number of steps left.
    remain: usize,
    /// The last page-table entry read, after masking.
    raw_pte: Option<u64>,
    /// Nesting depth of indirect reads.
    nest: usize,
}

impl<'a> Step<'a> {
    /// Constructs a new [`Step`] executing `meth`.
    pub fn new(ctx: &'a Context<'a>, sys: Option<&'a System>, meth: &'a Method) -> Self {
        Self {
            ctx,
            sys,
            meth,
            input: FullAddress::NONE,
            base: FullAddress::NONE,
            idx: [0; FIELDS_MAX],
            fields: [0; FIELDS_MAX],
            nfields: 0,
            remain: 0,
            raw_pte: None,
            nest: 0,
        }
    }

    /// Sets the nesting depth of reads issued by this [`Step`].
    #[must_use]
    pub(crate) fn with_nesting(mut self, nest: usize) -> Self {
        self.nest = nest;
        self
    }

    /// Returns the method being executed.
    pub fn method(&self) -> &'a Method {
        self.meth
    }

    /// Returns the address the step was launched on.
    pub fn input(&self) -> FullAddress {
        self.input
    }

    /// Returns the number of steps left; `0` once the result is available.
    pub fn remain(&self) -> usize {
        self.remain
    }

    /// Returns the current table base, or the result once [`Step::remain`] is zero.
    pub fn base(&self) -> FullAddress {
        self.base
    }

    /// Returns the last page-table entry read, with the PTE mask applied.
    pub fn raw_pte(&self) -> Option<u64> {
        self.raw_pte
    }

    /// Returns the address field at `level`, where `0` is the in-page offset.
    pub fn index(&self, level: usize) -> Option<u64> {
        (level < self.nfields).then(|| self.idx[level])
    }

    /// Starts executing the method on `input`.
    ///
    /// Methods that need no memory access are resolved immediately.
    ///
    /// # Errors
    ///
    /// - [`Error::Unconfigured`]: Returned for [`Method::NoMeth`] or a page table without a root.
    /// - [`Error::NotFound`]: Returned if no lookup entry covers `input`.
    /// - [`Error::InvalidAddress`]: Returned if `input` is outside the paging form.
    /// - [`Error::NotImplemented`]: Returned for the `none` page-table format.
    /// - Any error produced by a custom resolver.
    pub fn launch(&mut self, input: FullAddress) -> Result<(), Error> {
        self.input = input;
        self.raw_pte = None;
        self.idx = [0; FIELDS_MAX];
        self.fields = [0; FIELDS_MAX];
        self.nfields = 0;
        self.remain = 0;

        let value = input.value();
        let meth = self.meth;
        match meth {
            Method::NoMeth => {
                return Err(Error::Unconfigured {
                    slot: Slot::Method(None),
                });
            }
            Method::Custom(custom) => self.base = custom.translate(self.ctx, input)?,
            Method::Linear(params) => {
                self.base = FullAddress::new(params.target_as, value.wrapping_add_signed(params.off));
            }
            Method::Lookup(params) => {
                let dest = params.resolve(value).ok_or(Error::NotFound { addr: value })?;
                self.base = FullAddress::new(params.target_as, dest);
            }
            Method::MemArr(params) => {
                self.base = params.base;
                self.idx[0] = value.checked_shr(u32::from(params.shift)).unwrap_or(0);
                self.nfields = 1;
                self.remain = 1;
            }
            Method::Pgt(params) => self.launch_pgt(params, value)?,
        }

        log::trace!("launch {} on {input}: remain={}", meth.kind(), self.remain);
        Ok(())
    }

    /// Splits `value` into address fields and positions the step at the root table.
    fn launch_pgt(&mut self, params: &PgtParams, value: u64) -> Result<(), Error> {
        if params.root.is_none() {
            return Err(Error::Unconfigured { slot: Slot::Root });
        }

        let format = params.form.format();
        if matches!(format, PteFormat::None) {
            return Err(Error::NotImplemented("page table format none"));
        }

        let desc = params.form.input_descriptor();
        let value = if format.ignores_high_bits() {
            desc.truncate(value)
        } else if desc.is_valid(value) {
            value
        } else {
            return Err(Error::InvalidAddress { addr: value });
        };

        let mut shift = 0u32;
        for (i, &bits) in params.form.fields().iter().rev().enumerate() {
            self.fields[i] = bits;
            self.idx[i] = value.checked_shr(shift).unwrap_or(0) & low_mask(u32::from(bits));
            shift += u32::from(bits);
        }

        self.nfields = params.form.fields().len();
        self.remain = self.nfields;
        self.base = params.root;
        Ok(())
    }

    /// Advances the execution by one step.
    ///
    /// Does nothing once the result is available.
    ///
    /// # Errors
    ///
    /// - [`Error::Read`]: Returned if a page-table entry or array element cannot be read.
    /// - [`Error::InvalidEntry`]: Returned if a page-table entry is not present or not valid.
    /// - [`Error::CycleDetected`]: Returned if indirect reads nest too deeply.
    pub fn step(&mut self) -> Result<(), Error> {
        let meth = self.meth;
        match (self.remain, meth) {
            (0, _) => Ok(()),
            (1, Method::MemArr(params)) => self.finish_memarr(params),
            (1, Method::Pgt(params)) => {
                self.base = FullAddress::new(
                    params.target_as,
                    self.base.value().wrapping_add(self.idx[0]),
                );
                self.remain = 0;
                Ok(())
            }
            (_, Method::Pgt(params)) => self.step_pgt(params),
            _ => {
                self.remain = 0;
                Ok(())
            }
        }
    }

    /// Runs the execution to completion and returns the result.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by [`Step::step`].
    pub fn walk(&mut self) -> Result<FullAddress, Error> {
        while self.remain > 0 {
            self.step()?;
        }

        Ok(self.base)
    }

    /// Reads the array element selected by the input and makes its value the result.
    fn finish_memarr(&mut self, params: &MemArrParams) -> Result<(), Error> {
        let addr = params
            .base
            .wrapping_add(self.idx[0].wrapping_mul(params.elemsz));
        let value = self.ctx.read_uint(
            self.sys,
            addr,
            params.valsz,
            "memory array element",
            self.nest,
        )?;

        self.base = FullAddress::new(params.target_as, value);
        self.remain = 0;
        Ok(())
    }

    /// Reads and decodes the entry of the table at the current level.
    fn step_pgt(&mut self, params: &PgtParams) -> Result<(), Error> {
        let level = self.remain - 1;
        let format = params.form.format();
        let size = format.entry_size();
        let index = self.idx[level];
        let what = entry_name(level, self.nfields - 1);

        let addr = self.base.wrapping_add(index.wrapping_mul(u64::from(size)));
        let pte = self.ctx.read_uint(self.sys, addr, size, what, self.nest)? & !params.pte_mask;
        self.raw_pte = Some(pte);
        log::trace!("{what}[{index:#x}] at {addr}: {pte:#x}");

        match pgt::decode(
            format,
            pte,
            level,
            &self.fields[..self.nfields],
            params.target_as,
        ) {
            Decoded::Table(next) => {
                self.base = next;
                self.remain = level;
            }
            Decoded::Page(frame) => {
                self.ctx.bury(addr);
                self.base = FullAddress::new(params.target_as, frame);
                self.remain = 1;
            }
            Decoded::Huge(frame) => {
                let off = self.lower_offset(level);
                self.idx[0] |= off;
                let block_shift = self.fields[..level].iter().copied().map(u32::from).sum();

                self.base = FullAddress::new(params.target_as, frame & !low_mask(block_shift));
                self.remain = 1;
                log::trace!("huge page at {}", self.base);
            }
            Decoded::HugeDirectory { table, shift } => {
                let off = self.lower_offset(level);

                self.idx[1] = off.checked_shr(shift).unwrap_or(0);
                self.idx[0] |= off & low_mask(shift);
                self.base = table;
                self.remain = 2;
                log::trace!("huge page directory at {table}, shift {shift}");
            }
            Decoded::NotPresent => {
                return Err(Error::InvalidEntry { level, index, pte });
            }
        }

        Ok(())
    }

    /// Returns the byte offset selected by the fields below `level`, excluding the page offset.
    fn lower_offset(&self, level: usize) -> u64 {
        (1..level).rev().fold(0, |off, i| {
            (off | self.idx[i])
                .checked_shl(u32::from(self.fields[i - 1]))
                .unwrap_or(0)
        })
    }
}

/// Returns a mask of the low `bits` bits.
const fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Returns a name for entries of the table at `level`, where `top` is the root table level.
fn entry_name(level: usize, top: usize) -> &'static str {
    match level {
        _ if level == top => "pgd",
        1 => "pte",
        2 => "pmd",
        3 => "pud",
        4 => "p4d",
        _ => "pgd",
    }
}
