//! vibelink - nRF52840 firmware entry point.
//!
//! Brings the SoftDevice S140 up in a central-only configuration (one
//! link, no peripheral role, no bonding) and spawns the three long-lived
//! tasks: the SoftDevice runner, the link supervisor, and the periodic
//! control loop.

#![no_std]
#![no_main]

use defmt::{info, unwrap};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::interrupt::Priority;
use nrf_softdevice::{raw, Softdevice};
use panic_probe as _;

mod ble;
mod config;
mod control;
mod error;

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn link_task(sd: &'static Softdevice) -> ! {
    ble::link_task::link_task(sd).await
}

#[embassy_executor::task]
async fn control_task() -> ! {
    control::control_loop().await
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_cfg_conn_count_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 128 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 0,
            central_role_count: 1,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: b"vibelink" as *const u8 as _,
            current_len: 8,
            max_len: 8,
            write_perm: unsafe { core::mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // The SoftDevice owns the highest interrupt priorities; keep embassy's
    // drivers out of them.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let _p = embassy_nrf::init(nrf_config);

    let sd = Softdevice::enable(&softdevice_config());

    info!("vibelink starting");

    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(link_task(sd)));
    unwrap!(spawner.spawn(control_task()));
}
