use std::ops::Add;

/// An index into a byte within an ELF file.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Offset(pub u64);

/// The address of a byte in the process that cored. These are normally associated with
/// one of the load segments in the core file.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct VirtualAddr(pub u64);

pub trait Address: Copy + Ord + Add<u64, Output = Self> {
    fn raw(self) -> u64;
}

impl Address for Offset {
    fn raw(self) -> u64 {
        self.0
    }
}

impl Address for VirtualAddr {
    fn raw(self) -> u64 {
        self.0
    }
}

/// A range of bytes that can be addressed using either offsets into an ELF file or
/// virtual addresses. Sizes are always 64 bits so 32-bit hosts can describe 64-bit cores.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Bytes<A: Address> {
    pub start: A,
    pub size: u64,
}

impl Bytes<Offset> {
    pub fn from_raw(start: u64, size: u64) -> Self {
        Bytes {
            start: Offset(start),
            size,
        }
    }
}

impl Bytes<VirtualAddr> {
    pub fn from_raw(start: u64, size: u64) -> Self {
        Bytes {
            start: VirtualAddr(start),
            size,
        }
    }
}

impl<A: Address> Bytes<A> {
    pub fn contains(&self, addr: A) -> bool {
        self.delta(addr).is_some()
    }

    /// Distance of addr from the start of the range, if addr is inside it.
    pub fn delta(&self, addr: A) -> Option<u64> {
        addr.raw()
            .checked_sub(self.start.raw())
            .filter(|&d| d < self.size)
    }

    /// One past the last byte. Saturates for ranges that run off the end of the
    /// address space (corrupt cores).
    pub fn end(&self) -> u64 {
        self.start.raw().saturating_add(self.size)
    }
}

impl Add<u64> for VirtualAddr {
    type Output = VirtualAddr;

    fn add(self, rhs: u64) -> Self::Output {
        VirtualAddr(self.0.wrapping_add(rhs))
    }
}

impl Add<u64> for Offset {
    type Output = Offset;

    fn add(self, rhs: u64) -> Self::Output {
        Offset(self.0.wrapping_add(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_inside_and_outside() {
        let b = Bytes::<VirtualAddr>::from_raw(0x1000, 0x100);
        assert_eq!(b.delta(VirtualAddr(0x1000)), Some(0));
        assert_eq!(b.delta(VirtualAddr(0x10ff)), Some(0xff));
        assert_eq!(b.delta(VirtualAddr(0x1100)), None);
        assert_eq!(b.delta(VirtualAddr(0xfff)), None);
        assert_eq!(b.end(), 0x1100);
    }

    #[test]
    fn end_saturates() {
        let b = Bytes::<Offset>::from_raw(u64::MAX - 1, 16);
        assert_eq!(b.end(), u64::MAX);
        assert!(b.contains(Offset(u64::MAX)));
    }

    #[test]
    fn empty_range_contains_nothing() {
        let b = Bytes::<Offset>::from_raw(0x40, 0);
        assert!(!b.contains(Offset(0x40)));
    }
}
