//! Volume Rewards: Solana program that meters per-period trading volume and
//! pays each trader a pro-rata share of a fixed per-period reward.

#![deny(unsafe_code)]

pub mod engine;
pub mod math;

// 1. mod constants
pub mod constants {
    use core::mem::size_of;
    use crate::engine::VenueEngine;
    use crate::state::{SlabHeader, VaultConfig};

    pub const MAGIC: u64 = 0x564f4c5245574152; // "VOLREWAR"
    pub const VERSION: u32 = 1;

    pub const HEADER_LEN: usize = size_of::<SlabHeader>();
    pub const CONFIG_LEN: usize = size_of::<VaultConfig>();
    // Engine records are byte arrays (alignment 1), so no padding is needed
    pub const ENGINE_OFF: usize = HEADER_LEN + CONFIG_LEN;
    pub const ENGINE_LEN: usize = size_of::<VenueEngine>();
    pub const SLAB_LEN: usize = ENGINE_OFF + ENGINE_LEN;

    pub const VAULT_SEED: &[u8] = b"vault";

    #[cfg(not(feature = "devnet"))]
    pub const MIN_PERIOD_DURATION: u64 = 3_600;
    #[cfg(feature = "devnet")]
    pub const MIN_PERIOD_DURATION: u64 = 1;
}

// 2. mod error
pub mod error {
    use num_derive::FromPrimitive;
    use solana_program::{
        decode_error::DecodeError,
        msg,
        program_error::{PrintProgramError, ProgramError},
    };
    use thiserror::Error;
    use crate::engine::LedgerError;

    #[derive(Clone, Copy, Debug, Eq, PartialEq, Error, FromPrimitive)]
    pub enum VolumeRewardsError {
        #[error("slab magic mismatch")]
        InvalidMagic,
        #[error("unsupported slab version")]
        InvalidVersion,
        #[error("venue already initialized")]
        AlreadyInitialized,
        #[error("venue not initialized")]
        NotInitialized,
        #[error("slab account has the wrong size")]
        InvalidSlabLen,
        #[error("reward vault is not the venue's token account")]
        InvalidVaultAta,
        #[error("token account mint does not match the reward mint")]
        InvalidMint,
        #[error("account must sign")]
        ExpectedSigner,
        #[error("account must be writable")]
        ExpectedWritable,
        #[error("token account is not owned by the beneficiary")]
        InvalidBeneficiary,
        #[error("invalid venue configuration")]
        InvalidConfigParam,
        #[error("engine region is corrupt")]
        EngineCorrupt,
        #[error("trader table is full")]
        EngineFull,
        // Engine errors mapped:
        #[error("volume cannot be zero")]
        EngineInvalidVolume,
        #[error("caller is not authorized for this operation")]
        EngineUnauthorized,
        #[error("no reward to distribute")]
        EngineZeroReward,
        #[error("reward transfer failed")]
        EngineTransferFailed,
        #[error("close amount exceeds the held position")]
        EnginePositionExceeded,
        #[error("arithmetic overflow")]
        EngineOverflow,
        #[error("identity must not be zero")]
        EngineInvalidIdentity,
        #[error("period duration must be positive")]
        EngineInvalidPeriodDuration,
    }

    impl From<VolumeRewardsError> for ProgramError {
        fn from(e: VolumeRewardsError) -> Self {
            ProgramError::Custom(e as u32)
        }
    }

    impl<T> DecodeError<T> for VolumeRewardsError {
        fn type_of() -> &'static str {
            "VolumeRewardsError"
        }
    }

    impl PrintProgramError for VolumeRewardsError {
        fn print<E>(&self)
        where
            E: 'static
                + std::error::Error
                + DecodeError<E>
                + PrintProgramError
                + num_traits::FromPrimitive,
        {
            msg!("Error: {}", self);
        }
    }

    pub fn map_ledger_error(e: LedgerError) -> ProgramError {
        let err = match e {
            LedgerError::InvalidVolume => VolumeRewardsError::EngineInvalidVolume,
            LedgerError::Unauthorized => VolumeRewardsError::EngineUnauthorized,
            LedgerError::ZeroReward => VolumeRewardsError::EngineZeroReward,
            LedgerError::TransferFailed => VolumeRewardsError::EngineTransferFailed,
            LedgerError::PositionExceeded => VolumeRewardsError::EnginePositionExceeded,
            LedgerError::Overflow => VolumeRewardsError::EngineOverflow,
            LedgerError::InvalidIdentity => VolumeRewardsError::EngineInvalidIdentity,
            LedgerError::InvalidPeriodDuration => VolumeRewardsError::EngineInvalidPeriodDuration,
            LedgerError::VenueFull => VolumeRewardsError::EngineFull,
            LedgerError::Corrupt => VolumeRewardsError::EngineCorrupt,
        };
        ProgramError::Custom(err as u32)
    }
}

// 3. mod ix
pub mod ix {
    use solana_program::{program_error::ProgramError, pubkey::Pubkey};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Instruction {
        InitVenue {
            settlement_trigger: Pubkey,
            period_duration: u64,
            reward_per_period: u64,
        },
        SubmitTrade { amount: u128, is_open: bool, is_long: bool },
        ClaimReward { trader: Pubkey },
        FundPool { amount: u64 },
        WithdrawPool,
        SetSettlementTrigger { settlement_trigger: Pubkey },
        UpdateOwner { new_owner: Pubkey },
    }

    impl Instruction {
        pub fn decode(input: &[u8]) -> Result<Self, ProgramError> {
            let (&tag, mut rest) = input.split_first().ok_or(ProgramError::InvalidInstructionData)?;

            match tag {
                0 => { // InitVenue
                    let settlement_trigger = read_pubkey(&mut rest)?;
                    let period_duration = read_u64(&mut rest)?;
                    let reward_per_period = read_u64(&mut rest)?;
                    Ok(Instruction::InitVenue { settlement_trigger, period_duration, reward_per_period })
                },
                1 => { // SubmitTrade
                    let amount = read_u128(&mut rest)?;
                    let is_open = read_bool(&mut rest)?;
                    let is_long = read_bool(&mut rest)?;
                    Ok(Instruction::SubmitTrade { amount, is_open, is_long })
                },
                2 => { // ClaimReward
                    let trader = read_pubkey(&mut rest)?;
                    Ok(Instruction::ClaimReward { trader })
                },
                3 => { // FundPool
                    let amount = read_u64(&mut rest)?;
                    Ok(Instruction::FundPool { amount })
                },
                4 => Ok(Instruction::WithdrawPool),
                5 => { // SetSettlementTrigger
                    let settlement_trigger = read_pubkey(&mut rest)?;
                    Ok(Instruction::SetSettlementTrigger { settlement_trigger })
                },
                6 => { // UpdateOwner
                    let new_owner = read_pubkey(&mut rest)?;
                    Ok(Instruction::UpdateOwner { new_owner })
                },
                _ => Err(ProgramError::InvalidInstructionData),
            }
        }

        /// Wire encoding, the inverse of [`Instruction::decode`].
        pub fn pack(&self) -> Vec<u8> {
            let mut buf = Vec::with_capacity(49);
            match self {
                Instruction::InitVenue { settlement_trigger, period_duration, reward_per_period } => {
                    buf.push(0);
                    buf.extend_from_slice(settlement_trigger.as_ref());
                    buf.extend_from_slice(&period_duration.to_le_bytes());
                    buf.extend_from_slice(&reward_per_period.to_le_bytes());
                },
                Instruction::SubmitTrade { amount, is_open, is_long } => {
                    buf.push(1);
                    buf.extend_from_slice(&amount.to_le_bytes());
                    buf.push(*is_open as u8);
                    buf.push(*is_long as u8);
                },
                Instruction::ClaimReward { trader } => {
                    buf.push(2);
                    buf.extend_from_slice(trader.as_ref());
                },
                Instruction::FundPool { amount } => {
                    buf.push(3);
                    buf.extend_from_slice(&amount.to_le_bytes());
                },
                Instruction::WithdrawPool => buf.push(4),
                Instruction::SetSettlementTrigger { settlement_trigger } => {
                    buf.push(5);
                    buf.extend_from_slice(settlement_trigger.as_ref());
                },
                Instruction::UpdateOwner { new_owner } => {
                    buf.push(6);
                    buf.extend_from_slice(new_owner.as_ref());
                },
            }
            buf
        }
    }

    fn take<const N: usize>(input: &mut &[u8]) -> Result<[u8; N], ProgramError> {
        if input.len() < N { return Err(ProgramError::InvalidInstructionData); }
        let (bytes, rest) = input.split_at(N);
        *input = rest;
        <[u8; N]>::try_from(bytes).map_err(|_| ProgramError::InvalidInstructionData)
    }

    fn read_u8(input: &mut &[u8]) -> Result<u8, ProgramError> {
        let (&val, rest) = input.split_first().ok_or(ProgramError::InvalidInstructionData)?;
        *input = rest;
        Ok(val)
    }

    fn read_bool(input: &mut &[u8]) -> Result<bool, ProgramError> {
        match read_u8(input)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ProgramError::InvalidInstructionData),
        }
    }

    fn read_u64(input: &mut &[u8]) -> Result<u64, ProgramError> {
        Ok(u64::from_le_bytes(take::<8>(input)?))
    }

    fn read_u128(input: &mut &[u8]) -> Result<u128, ProgramError> {
        Ok(u128::from_le_bytes(take::<16>(input)?))
    }

    fn read_pubkey(input: &mut &[u8]) -> Result<Pubkey, ProgramError> {
        Ok(Pubkey::new_from_array(take::<32>(input)?))
    }
}

// 4. mod accounts
pub mod accounts {
    use solana_program::{account_info::AccountInfo, program_error::ProgramError, pubkey::Pubkey};
    use crate::{constants::VAULT_SEED, error::VolumeRewardsError};

    pub fn expect_len(accounts: &[AccountInfo], n: usize) -> Result<(), ProgramError> {
        if accounts.len() < n {
            return Err(ProgramError::NotEnoughAccountKeys);
        }
        Ok(())
    }

    pub fn expect_signer(ai: &AccountInfo) -> Result<(), ProgramError> {
        if !ai.is_signer {
            return Err(VolumeRewardsError::ExpectedSigner.into());
        }
        Ok(())
    }

    pub fn expect_writable(ai: &AccountInfo) -> Result<(), ProgramError> {
        if !ai.is_writable {
            return Err(VolumeRewardsError::ExpectedWritable.into());
        }
        Ok(())
    }

    pub fn expect_owner(ai: &AccountInfo, owner: &Pubkey) -> Result<(), ProgramError> {
        if ai.owner != owner {
            return Err(ProgramError::IllegalOwner);
        }
        Ok(())
    }

    pub fn expect_key(ai: &AccountInfo, expected: &Pubkey) -> Result<(), ProgramError> {
        if ai.key != expected {
            return Err(ProgramError::InvalidArgument);
        }
        Ok(())
    }

    /// PDA that owns the reward vault of the venue stored in `slab_key`.
    pub fn derive_vault_authority(program_id: &Pubkey, slab_key: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[VAULT_SEED, slab_key.as_ref()], program_id)
    }
}

// 5. mod state
pub mod state {
    use bytemuck::{Pod, Zeroable};
    use core::cell::RefMut;
    use solana_program::account_info::AccountInfo;
    use solana_program::program_error::ProgramError;
    use crate::constants::{CONFIG_LEN, ENGINE_LEN, ENGINE_OFF, HEADER_LEN};
    use crate::engine::{PeriodClock, Roles, VenueEngine};
    use crate::error::VolumeRewardsError;

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Pod, Zeroable)]
    pub struct SlabHeader {
        pub magic: u64,
        pub version: u32,
        pub bump: u8,
        pub _padding: [u8; 3],
        pub _reserved: [u8; 48],
    }

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Pod, Zeroable)]
    pub struct VaultConfig {
        pub reward_mint: [u8; 32],
        pub vault_pubkey: [u8; 32],
        pub vault_authority_bump: u8,
        pub _padding: [u8; 7],
    }

    pub fn slab_data_mut<'a, 'b>(ai: &'b AccountInfo<'a>) -> Result<RefMut<'b, &'a mut [u8]>, ProgramError> {
        Ok(ai.try_borrow_mut_data()?)
    }

    pub fn read_header(data: &[u8]) -> SlabHeader {
        let mut h = SlabHeader::zeroed();
        let src = &data[..HEADER_LEN];
        let dst = bytemuck::bytes_of_mut(&mut h);
        dst.copy_from_slice(src);
        h
    }

    pub fn write_header(data: &mut [u8], h: &SlabHeader) {
        let src = bytemuck::bytes_of(h);
        let dst = &mut data[..HEADER_LEN];
        dst.copy_from_slice(src);
    }

    pub fn read_config(data: &[u8]) -> VaultConfig {
        let mut c = VaultConfig::zeroed();
        let src = &data[HEADER_LEN..HEADER_LEN + CONFIG_LEN];
        let dst = bytemuck::bytes_of_mut(&mut c);
        dst.copy_from_slice(src);
        c
    }

    pub fn write_config(data: &mut [u8], c: &VaultConfig) {
        let src = bytemuck::bytes_of(c);
        let dst = &mut data[HEADER_LEN..HEADER_LEN + CONFIG_LEN];
        dst.copy_from_slice(src);
    }

    fn engine_region(data: &[u8]) -> Result<&VenueEngine, ProgramError> {
        let bytes = data
            .get(ENGINE_OFF..ENGINE_OFF + ENGINE_LEN)
            .ok_or(VolumeRewardsError::InvalidSlabLen)?;
        bytemuck::try_from_bytes(bytes).map_err(|_| VolumeRewardsError::EngineCorrupt.into())
    }

    fn engine_region_mut(data: &mut [u8]) -> Result<&mut VenueEngine, ProgramError> {
        let bytes = data
            .get_mut(ENGINE_OFF..ENGINE_OFF + ENGINE_LEN)
            .ok_or(VolumeRewardsError::InvalidSlabLen)?;
        bytemuck::try_from_bytes_mut(bytes).map_err(|_| VolumeRewardsError::EngineCorrupt.into())
    }

    /// In-place view of an initialized engine.
    pub fn engine_ref(data: &[u8]) -> Result<&VenueEngine, ProgramError> {
        let engine = engine_region(data)?;
        if !engine.is_well_formed() {
            return Err(VolumeRewardsError::EngineCorrupt.into());
        }
        Ok(engine)
    }

    pub fn engine_mut(data: &mut [u8]) -> Result<&mut VenueEngine, ProgramError> {
        let engine = engine_region_mut(data)?;
        if !engine.is_well_formed() {
            return Err(VolumeRewardsError::EngineCorrupt.into());
        }
        Ok(engine)
    }

    pub fn init_engine(data: &mut [u8], clock: PeriodClock, reward_per_period: u64, roles: Roles) -> Result<(), ProgramError> {
        engine_region_mut(data)?.init(clock, reward_per_period, roles);
        Ok(())
    }
}

// 6. mod treasury
pub mod treasury {
    use solana_program::{
        account_info::AccountInfo,
        program::{invoke, invoke_signed},
        program_error::ProgramError,
    };

    /// Move `amount` from a user token account into the vault. `authority` signs.
    pub fn deposit<'a>(
        token_program: &AccountInfo<'a>,
        source: &AccountInfo<'a>,
        dest: &AccountInfo<'a>,
        authority: &AccountInfo<'a>,
        amount: u64,
    ) -> Result<(), ProgramError> {
        let ix = spl_token::instruction::transfer(
            token_program.key,
            source.key,
            dest.key,
            authority.key,
            &[],
            amount,
        )?;
        invoke(&ix, &[source.clone(), dest.clone(), authority.clone(), token_program.clone()])
    }

    /// Move `amount` out of the vault, signed by the vault-authority PDA.
    pub fn withdraw<'a>(
        token_program: &AccountInfo<'a>,
        source: &AccountInfo<'a>,
        dest: &AccountInfo<'a>,
        authority: &AccountInfo<'a>,
        amount: u64,
        signer_seeds: &[&[&[u8]]],
    ) -> Result<(), ProgramError> {
        let ix = spl_token::instruction::transfer(
            token_program.key,
            source.key,
            dest.key,
            authority.key,
            &[],
            amount,
        )?;
        invoke_signed(&ix, &[source.clone(), dest.clone(), authority.clone(), token_program.clone()], signer_seeds)
    }
}

// 7. mod processor
pub mod processor {
    use solana_program::{
        account_info::AccountInfo, entrypoint::ProgramResult, msg, pubkey::Pubkey,
        sysvar::{clock::Clock, Sysvar},
        program_error::ProgramError,
        program_pack::Pack,
    };
    use crate::{
        ix::Instruction,
        state::{self, SlabHeader, VaultConfig},
        accounts,
        constants::{MAGIC, VERSION, SLAB_LEN, VAULT_SEED, MIN_PERIOD_DURATION},
        engine::{self, AssetTransfer, CallContext, Identity, LedgerError, PeriodClock, Roles, Trade},
        error::{VolumeRewardsError, map_ledger_error},
        treasury,
    };

    /// Pays out of the reward vault through an SPL Token CPI signed by the
    /// vault-authority PDA. Only the owner of `dest` may be paid.
    struct VaultTransfer<'a, 'b> {
        token_program: &'b AccountInfo<'a>,
        vault: &'b AccountInfo<'a>,
        dest: &'b AccountInfo<'a>,
        authority: &'b AccountInfo<'a>,
        dest_owner: Identity,
        slab_key: &'b Pubkey,
        bump: u8,
    }

    impl AssetTransfer for VaultTransfer<'_, '_> {
        fn transfer(&mut self, to: &Identity, amount: u64) -> engine::Result<()> {
            if *to != self.dest_owner {
                return Err(LedgerError::TransferFailed);
            }
            let bump = [self.bump];
            let seeds: [&[u8]; 3] = [VAULT_SEED, self.slab_key.as_ref(), &bump];
            let signer_seeds: [&[&[u8]]; 1] = [&seeds];
            treasury::withdraw(self.token_program, self.vault, self.dest, self.authority, amount, &signer_seeds)
                .map_err(|e| {
                    msg!("vault transfer of {} failed: {:?}", amount, e);
                    LedgerError::TransferFailed
                })
        }
    }

    fn slab_guard(program_id: &Pubkey, slab: &AccountInfo, data: &[u8]) -> Result<(), ProgramError> {
        accounts::expect_owner(slab, program_id)?;
        if data.len() != SLAB_LEN { return Err(VolumeRewardsError::InvalidSlabLen.into()); }
        Ok(())
    }

    fn require_initialized(data: &[u8]) -> Result<(), ProgramError> {
        let h = state::read_header(data);
        if h.magic != MAGIC { return Err(VolumeRewardsError::NotInitialized.into()); }
        if h.version != VERSION { return Err(VolumeRewardsError::InvalidVersion.into()); }
        Ok(())
    }

    fn verify_vault(a_vault: &AccountInfo, expected_owner: &Pubkey, expected_mint: &Pubkey, expected_pubkey: &Pubkey) -> Result<(), ProgramError> {
        if a_vault.key != expected_pubkey { return Err(VolumeRewardsError::InvalidVaultAta.into()); }
        if a_vault.owner != &spl_token::ID { return Err(VolumeRewardsError::InvalidVaultAta.into()); }
        if a_vault.data_len() != spl_token::state::Account::LEN { return Err(VolumeRewardsError::InvalidVaultAta.into()); }

        let data = a_vault.try_borrow_data()?;
        let tok = spl_token::state::Account::unpack(&data)?;
        if tok.mint != *expected_mint { return Err(VolumeRewardsError::InvalidMint.into()); }
        if tok.owner != *expected_owner { return Err(VolumeRewardsError::InvalidVaultAta.into()); }
        Ok(())
    }

    /// Token account that receives a payout: must hold the reward mint and
    /// belong to `beneficiary`.
    fn verify_payee(a_dest: &AccountInfo, mint: &Pubkey, beneficiary: &Pubkey) -> Result<(), ProgramError> {
        accounts::expect_owner(a_dest, &spl_token::ID)?;
        let data = a_dest.try_borrow_data()?;
        let tok = spl_token::state::Account::unpack(&data)?;
        if tok.mint != *mint { return Err(VolumeRewardsError::InvalidMint.into()); }
        if tok.owner != *beneficiary { return Err(VolumeRewardsError::InvalidBeneficiary.into()); }
        Ok(())
    }

    fn vault_balance(a_vault: &AccountInfo) -> Result<u64, ProgramError> {
        let data = a_vault.try_borrow_data()?;
        Ok(spl_token::state::Account::unpack(&data)?.amount)
    }

    /// Slab, config and vault checks shared by every instruction touching the vault.
    fn load_vault_config(program_id: &Pubkey, a_slab: &AccountInfo, data: &[u8], a_vault: &AccountInfo) -> Result<VaultConfig, ProgramError> {
        slab_guard(program_id, a_slab, data)?;
        require_initialized(data)?;
        let config = state::read_config(data);

        let (auth, _) = accounts::derive_vault_authority(program_id, a_slab.key);
        verify_vault(a_vault, &auth, &Pubkey::new_from_array(config.reward_mint), &Pubkey::new_from_array(config.vault_pubkey))?;
        Ok(config)
    }

    pub fn process_instruction<'a, 'b>(
        program_id: &Pubkey,
        accounts: &'b [AccountInfo<'a>],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = Instruction::decode(instruction_data)?;

        match instruction {
            Instruction::InitVenue { settlement_trigger, period_duration, reward_per_period } => {
                accounts::expect_len(accounts, 5)?;
                let a_owner = &accounts[0];
                let a_slab = &accounts[1];
                let a_mint = &accounts[2];
                let a_vault = &accounts[3];

                accounts::expect_signer(a_owner)?;
                accounts::expect_writable(a_slab)?;

                if settlement_trigger == Pubkey::default()
                    || period_duration < MIN_PERIOD_DURATION
                    || reward_per_period == 0
                {
                    return Err(VolumeRewardsError::InvalidConfigParam.into());
                }

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;

                let header = state::read_header(&data);
                if header.magic == MAGIC { return Err(VolumeRewardsError::AlreadyInitialized.into()); }

                let (auth, bump) = accounts::derive_vault_authority(program_id, a_slab.key);
                verify_vault(a_vault, &auth, a_mint.key, a_vault.key)?;

                let clock = Clock::from_account_info(&accounts[4])?;
                let period_clock = PeriodClock::new(clock.unix_timestamp, period_duration).map_err(map_ledger_error)?;
                let roles = Roles::new(a_owner.key.to_bytes(), settlement_trigger.to_bytes()).map_err(map_ledger_error)?;

                for b in data.iter_mut() { *b = 0; }

                state::init_engine(&mut data, period_clock, reward_per_period, roles)?;

                let config = VaultConfig {
                    reward_mint: a_mint.key.to_bytes(),
                    vault_pubkey: a_vault.key.to_bytes(),
                    vault_authority_bump: bump,
                    _padding: [0; 7],
                };
                state::write_config(&mut data, &config);

                let new_header = SlabHeader {
                    magic: MAGIC,
                    version: VERSION,
                    bump,
                    _padding: [0; 3],
                    _reserved: [0; 48],
                };
                state::write_header(&mut data, &new_header);

                msg!(
                    "InitVenue: owner={} trigger={} genesis={} period_duration={} reward_per_period={}",
                    a_owner.key, settlement_trigger, clock.unix_timestamp, period_duration, reward_per_period
                );
            },
            Instruction::SubmitTrade { amount, is_open, is_long } => {
                accounts::expect_len(accounts, 3)?;
                let a_trader = &accounts[0];
                let a_slab = &accounts[1];

                accounts::expect_signer(a_trader)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;

                let clock = Clock::from_account_info(&accounts[2])?;
                let ctx = CallContext::new(a_trader.key.to_bytes(), clock.unix_timestamp);

                let engine = state::engine_mut(&mut data)?;
                let receipt = engine
                    .submit_trade(&ctx, Trade { amount, is_open, is_long })
                    .map_err(map_ledger_error)?;

                msg!(
                    "SubmitTrade: trader={} period={} volume={} trader_volume={} market_volume={}",
                    a_trader.key, receipt.period, receipt.volume(), receipt.trader_volume, receipt.market_volume
                );
            },
            Instruction::ClaimReward { trader } => {
                accounts::expect_len(accounts, 7)?;
                let a_trigger = &accounts[0];
                let a_slab = &accounts[1];
                let a_vault = &accounts[2];
                let a_dest = &accounts[3];
                let a_vault_pda = &accounts[4];
                let a_token = &accounts[5];

                accounts::expect_signer(a_trigger)?;
                accounts::expect_writable(a_slab)?;
                accounts::expect_writable(a_vault)?;
                accounts::expect_writable(a_dest)?;
                accounts::expect_key(a_token, &spl_token::ID)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let config = load_vault_config(program_id, a_slab, &data, a_vault)?;

                let (auth, _) = accounts::derive_vault_authority(program_id, a_slab.key);
                accounts::expect_key(a_vault_pda, &auth)?;
                verify_payee(a_dest, &Pubkey::new_from_array(config.reward_mint), &trader)?;

                let clock = Clock::from_account_info(&accounts[6])?;
                let ctx = CallContext::new(a_trigger.key.to_bytes(), clock.unix_timestamp);

                let engine = state::engine_mut(&mut data)?;
                let mut vault = VaultTransfer {
                    token_program: a_token,
                    vault: a_vault,
                    dest: a_dest,
                    authority: a_vault_pda,
                    dest_owner: trader.to_bytes(),
                    slab_key: a_slab.key,
                    bump: config.vault_authority_bump,
                };
                let paid = engine
                    .claim_reward(&ctx, &trader.to_bytes(), &mut vault)
                    .map_err(map_ledger_error)?;

                msg!("RewardDistributed: trader={} amount={} periods={:?}", trader, paid.amount, paid.periods);
            },
            Instruction::FundPool { amount } => {
                accounts::expect_len(accounts, 5)?;
                let a_funder = &accounts[0];
                let a_slab = &accounts[1];
                let a_funder_ata = &accounts[2];
                let a_vault = &accounts[3];
                let a_token = &accounts[4];

                accounts::expect_signer(a_funder)?;
                accounts::expect_writable(a_funder_ata)?;
                accounts::expect_writable(a_vault)?;
                accounts::expect_key(a_token, &spl_token::ID)?;
                if amount == 0 {
                    return Err(VolumeRewardsError::InvalidConfigParam.into());
                }

                let data = a_slab.try_borrow_data()?;
                load_vault_config(program_id, a_slab, &data, a_vault)?;

                treasury::deposit(a_token, a_funder_ata, a_vault, a_funder, amount)?;

                msg!("FundPool: funder={} amount={}", a_funder.key, amount);
            },
            Instruction::WithdrawPool => {
                accounts::expect_len(accounts, 7)?;
                let a_owner = &accounts[0];
                let a_slab = &accounts[1];
                let a_vault = &accounts[2];
                let a_dest = &accounts[3];
                let a_vault_pda = &accounts[4];
                let a_token = &accounts[5];

                accounts::expect_signer(a_owner)?;
                accounts::expect_writable(a_slab)?;
                accounts::expect_writable(a_vault)?;
                accounts::expect_writable(a_dest)?;
                accounts::expect_key(a_token, &spl_token::ID)?;

                let mut data = state::slab_data_mut(a_slab)?;
                let config = load_vault_config(program_id, a_slab, &data, a_vault)?;

                let (auth, _) = accounts::derive_vault_authority(program_id, a_slab.key);
                accounts::expect_key(a_vault_pda, &auth)?;
                verify_payee(a_dest, &Pubkey::new_from_array(config.reward_mint), a_owner.key)?;

                let clock = Clock::from_account_info(&accounts[6])?;
                let ctx = CallContext::new(a_owner.key.to_bytes(), clock.unix_timestamp);
                let available = vault_balance(a_vault)?;

                let engine = state::engine_mut(&mut data)?;
                let mut vault = VaultTransfer {
                    token_program: a_token,
                    vault: a_vault,
                    dest: a_dest,
                    authority: a_vault_pda,
                    dest_owner: a_owner.key.to_bytes(),
                    slab_key: a_slab.key,
                    bump: config.vault_authority_bump,
                };
                let swept = engine
                    .withdraw_pool(&ctx, available, &mut vault)
                    .map_err(map_ledger_error)?;

                msg!("WithdrawPool: owner={} amount={}", a_owner.key, swept);
            },
            Instruction::SetSettlementTrigger { settlement_trigger } => {
                accounts::expect_len(accounts, 3)?;
                let a_owner = &accounts[0];
                let a_slab = &accounts[1];

                accounts::expect_signer(a_owner)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;

                let clock = Clock::from_account_info(&accounts[2])?;
                let ctx = CallContext::new(a_owner.key.to_bytes(), clock.unix_timestamp);

                state::engine_mut(&mut data)?
                    .set_settlement_trigger(&ctx, settlement_trigger.to_bytes())
                    .map_err(map_ledger_error)?;

                msg!("SetSettlementTrigger: trigger={}", settlement_trigger);
            },
            Instruction::UpdateOwner { new_owner } => {
                accounts::expect_len(accounts, 3)?;
                let a_owner = &accounts[0];
                let a_slab = &accounts[1];

                accounts::expect_signer(a_owner)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;

                let clock = Clock::from_account_info(&accounts[2])?;
                let ctx = CallContext::new(a_owner.key.to_bytes(), clock.unix_timestamp);

                state::engine_mut(&mut data)?
                    .update_owner(&ctx, new_owner.to_bytes())
                    .map_err(map_ledger_error)?;

                msg!("UpdateOwner: new_owner={}", new_owner);
            },
        }
        Ok(())
    }
}

// 8. mod entrypoint
#[cfg(not(feature = "no-entrypoint"))]
pub mod entrypoint {
    use solana_program::{
        account_info::AccountInfo, entrypoint, entrypoint::ProgramResult,
        program_error::PrintProgramError, pubkey::Pubkey,
    };
    use crate::{error::VolumeRewardsError, processor};

    entrypoint!(process_instruction);

    fn process_instruction<'a>(
        program_id: &Pubkey,
        accounts: &'a [AccountInfo<'a>],
        instruction_data: &[u8],
    ) -> ProgramResult {
        if let Err(error) = processor::process_instruction(program_id, accounts, instruction_data) {
            error.print::<VolumeRewardsError>();
            return Err(error);
        }
        Ok(())
    }
}
