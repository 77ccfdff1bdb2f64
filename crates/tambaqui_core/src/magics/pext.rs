//! Slider attacks via parallel bit extraction.
//!
//! Each square stores the relevant-occupancy mask, the attack set on an
//! empty board and an offset into one shared `u16` table. A lookup
//! extracts the occupancy bits with `pext`, fetches the compressed
//! attack subset and expands it against the empty-board attack set with
//! `pdep`. Hardware BMI2 instructions are used when compiled in,
//! otherwise a software loop.

use super::{relevant_mask, ray_attacks, SliderAttacks, BISHOP_DIRS, ROOK_DIRS};
use crate::bitboard::Bitboard;

/// Entries in the shared attack table: 5 248 bishop + 102 400 rook.
const TABLE_LEN: usize = 107_648;

#[derive(Clone, Copy, Default)]
struct SquareInfo {
    offset: usize,
    /// Relevant occupancy mask, the `pext` source on lookup.
    mask: u64,
    /// Empty-board attack set, the `pdep` target on lookup.
    attack_mask: u64,
}

pub struct PextMagics {
    table: Vec<u16>,
    rook: [SquareInfo; 64],
    bishop: [SquareInfo; 64],
}

impl PextMagics {
    pub fn new() -> Self {
        let mut table = Vec::with_capacity(TABLE_LEN);
        let mut bishop = [SquareInfo::default(); 64];
        let mut rook = [SquareInfo::default(); 64];
        Self::init(&mut table, &BISHOP_DIRS, &mut bishop);
        Self::init(&mut table, &ROOK_DIRS, &mut rook);
        debug_assert_eq!(table.len(), TABLE_LEN);
        PextMagics { table, rook, bishop }
    }

    fn init(table: &mut Vec<u16>, dirs: &[(i32, i32); 4], info: &mut [SquareInfo; 64]) {
        for sq in 0..64u8 {
            let mask = relevant_mask(sq, dirs);
            let attack_mask = ray_attacks(sq, dirs, 0);
            info[sq as usize] = SquareInfo {
                offset: table.len(),
                mask,
                attack_mask,
            };
            // Enumerate every occupancy subset of the mask; subset i is
            // exactly pdep(i, mask), so table order matches the pext
            // index used on lookup.
            let bits = mask.count_ones();
            for i in 0..(1u64 << bits) {
                let occ = pdep(i, mask);
                let attacks = ray_attacks(sq, dirs, occ);
                table.push(pext(attacks, attack_mask) as u16);
            }
        }
    }

    #[inline(always)]
    fn lookup(&self, info: &SquareInfo, occupied: u64) -> Bitboard {
        let idx = pext(occupied, info.mask) as usize;
        Bitboard(pdep(self.table[info.offset + idx] as u64, info.attack_mask))
    }
}

impl Default for PextMagics {
    fn default() -> Self {
        Self::new()
    }
}

impl SliderAttacks for PextMagics {
    #[inline(always)]
    fn rook_attacks(&self, sq: u8, occupied: Bitboard) -> Bitboard {
        self.lookup(&self.rook[sq as usize], occupied.0)
    }

    #[inline(always)]
    fn bishop_attacks(&self, sq: u8, occupied: Bitboard) -> Bitboard {
        self.lookup(&self.bishop[sq as usize], occupied.0)
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "bmi2"))]
#[inline(always)]
fn pext(value: u64, mask: u64) -> u64 {
    unsafe { core::arch::x86_64::_pext_u64(value, mask) }
}

#[cfg(all(target_arch = "x86_64", target_feature = "bmi2"))]
#[inline(always)]
fn pdep(value: u64, mask: u64) -> u64 {
    unsafe { core::arch::x86_64::_pdep_u64(value, mask) }
}

#[cfg(not(all(target_arch = "x86_64", target_feature = "bmi2")))]
#[inline]
fn pext(value: u64, mut mask: u64) -> u64 {
    let mut out = 0u64;
    let mut bit = 1u64;
    while mask != 0 {
        if value & mask & mask.wrapping_neg() != 0 {
            out |= bit;
        }
        mask &= mask - 1;
        bit <<= 1;
    }
    out
}

#[cfg(not(all(target_arch = "x86_64", target_feature = "bmi2")))]
#[inline]
fn pdep(value: u64, mut mask: u64) -> u64 {
    let mut out = 0u64;
    let mut bit = 1u64;
    while mask != 0 {
        if value & bit != 0 {
            out |= mask & mask.wrapping_neg();
        }
        mask &= mask - 1;
        bit <<= 1;
    }
    out
}
