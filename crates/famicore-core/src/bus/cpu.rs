use crate::{
    apu::Apu,
    cartridge::Cartridge,
    controller::Controller,
    memory::cpu as cpu_mem,
    ppu::Ppu,
    ram::cpu as cpu_ram,
};

/// CPU-visible bus that bridges the core to RAM, the PPU, the APU, the
/// controllers, and the cartridge mapper space.
///
/// | Range             | Device                                     |
/// |-------------------|--------------------------------------------|
/// | `$0000-$1FFF`     | 2 KiB internal RAM, mirrored every `$0800` |
/// | `$2000-$3FFF`     | PPU registers, mirrored every 8 bytes      |
/// | `$4000-$4013`     | APU channel registers                      |
/// | `$4014`           | OAM DMA trigger (write)                    |
/// | `$4015`           | APU status/enable                          |
/// | `$4016`           | Controller strobe (write) / pad 1 (read)   |
/// | `$4017`           | Frame counter (write) / pad 2 (read)       |
/// | `$4018-$401F`     | CPU test mode, unused                      |
/// | `$4020-$FFFF`     | Cartridge space through the mapper         |
///
/// Unmapped reads return zero (the documented open-bus simplification).
#[derive(Debug)]
pub struct CpuBus<'a> {
    ram: &'a mut cpu_ram::Ram,
    ppu: &'a mut Ppu,
    apu: &'a mut Apu,
    cartridge: &'a mut Cartridge,
    controllers: &'a mut [Controller; 2],
    /// Page latched by a `$4014` write; the CPU core performs the transfer
    /// and charges the 513/514 stall cycles after the instruction retires.
    oam_dma_page: Option<u8>,
}

impl<'a> CpuBus<'a> {
    pub fn new(
        ram: &'a mut cpu_ram::Ram,
        ppu: &'a mut Ppu,
        apu: &'a mut Apu,
        cartridge: &'a mut Cartridge,
        controllers: &'a mut [Controller; 2],
    ) -> Self {
        Self {
            ram,
            ppu,
            apu,
            cartridge,
            controllers,
            oam_dma_page: None,
        }
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        match addr {
            cpu_mem::INTERNAL_RAM_START..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram[(addr & cpu_mem::INTERNAL_RAM_MASK) as usize]
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => {
                self.ppu.cpu_read(addr, self.cartridge)
            }
            cpu_mem::APU_REGISTER_BASE..=cpu_mem::APU_CHANNEL_END => 0,
            cpu_mem::OAM_DMA => 0,
            cpu_mem::APU_STATUS => self.apu.cpu_read(addr),
            cpu_mem::CONTROLLER_PORT_1 => self.controllers[0].read(),
            cpu_mem::CONTROLLER_PORT_2 => self.controllers[1].read(),
            cpu_mem::TEST_MODE_BASE..=cpu_mem::TEST_MODE_END => 0,
            cpu_mem::CARTRIDGE_SPACE_BASE..=cpu_mem::CPU_ADDR_END => {
                self.cartridge.cpu_read(addr)
            }
        }
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            cpu_mem::INTERNAL_RAM_START..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram[(addr & cpu_mem::INTERNAL_RAM_MASK) as usize] = data;
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => {
                self.ppu.cpu_write(addr, data, self.cartridge);
            }
            cpu_mem::APU_REGISTER_BASE..=cpu_mem::APU_CHANNEL_END => {
                self.apu.cpu_write(addr, data);
            }
            cpu_mem::OAM_DMA => self.oam_dma_page = Some(data),
            cpu_mem::APU_STATUS => self.apu.cpu_write(addr, data),
            cpu_mem::CONTROLLER_PORT_1 => {
                // The strobe line is shared by both controller ports.
                self.controllers[0].write_strobe(data);
                self.controllers[1].write_strobe(data);
            }
            cpu_mem::CONTROLLER_PORT_2 => self.apu.cpu_write(addr, data),
            cpu_mem::TEST_MODE_BASE..=cpu_mem::TEST_MODE_END => {}
            cpu_mem::CARTRIDGE_SPACE_BASE..=cpu_mem::CPU_ADDR_END => {
                self.cartridge.cpu_write(addr, data);
            }
        }
    }

    /// Little-endian word read (used for interrupt vectors).
    #[inline]
    pub fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Level of the shared IRQ line: APU frame IRQ OR-ed with the mapper IRQ.
    #[inline]
    pub fn irq_line(&self) -> bool {
        self.apu.irq_pending() || self.cartridge.irq_pending()
    }

    /// Takes a pending OAM DMA request latched by a `$4014` write.
    #[inline]
    pub fn take_oam_dma(&mut self) -> Option<u8> {
        self.oam_dma_page.take()
    }

    /// Copies one DMA byte into PPU OAM through the `OAMDATA` register.
    #[inline]
    pub(crate) fn write_oam_data(&mut self, value: u8) {
        self.ppu
            .cpu_write(crate::memory::ppu::Register::OamData.addr(), value, self.cartridge);
    }
}
